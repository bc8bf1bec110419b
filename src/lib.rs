//! # zkelect
//!
//! Single-leader election for a fleet of cooperating processes, coordinated
//! through ZooKeeper:
//! - Every participant tries to create the same ephemeral marker node
//! - The one create that succeeds makes its creator the leader
//! - The marker vanishes with the leader's session, which wakes the others
//!   into a new round
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          ZooKeeper ensemble                  │
//! │   /GOLANG_ELECTING_MASTER          (persist) │
//! │   /GOLANG_ELECTING_MASTER/MASTER (ephemeral) │
//! └───────▲──────────────▲──────────────▲────────┘
//!         │ create/watch │              │
//!   ┌─────┴─────┐  ┌─────┴─────┐  ┌─────┴─────┐
//!   │ process A │  │ process B │  │ process C │
//!   │  leader   │  │  standby  │  │  standby  │
//!   └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! zkelect run --target 10.0.0.1:2181,10.0.0.2:2181/myapp
//! ```

pub mod common;
pub mod coordination;
pub mod election;

// Re-export commonly used types
pub use common::{Config, ConnectionTarget, ElectionSettings, Error, Result};
pub use election::{
    leadership_channel, start, start_with, ElectionEngine, ElectionHandle, ElectionState,
    LeadershipReceiver, LeadershipSender,
};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
