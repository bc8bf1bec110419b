//! Leader election
//!
//! [`start_with`] runs the first election round in the caller's task, then
//! hands the engine to a background re-election loop. Outcomes arrive on
//! the leadership channel, one `bool` per round, in order:
//!
//! ```ignore
//! let (tx, mut rx) = zkelect::leadership_channel();
//! let handle = zkelect::start("10.0.0.1:2181,10.0.0.2:2181/myapp", tx).await?;
//! while let Some(is_leader) = rx.recv().await {
//!     // ...
//! }
//! handle.shutdown().await?;
//! ```

pub mod engine;
mod watcher;

pub use engine::{ElectionEngine, ElectionState};

use crate::common::{ElectionSettings, Error, Result};
use crate::coordination::{Connector, ZooKeeperConnector};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sending half of the leadership channel; never blocks the engine
pub type LeadershipSender = mpsc::UnboundedSender<bool>;

/// Receiving half of the leadership channel
pub type LeadershipReceiver = mpsc::UnboundedReceiver<bool>;

pub fn leadership_channel() -> (LeadershipSender, LeadershipReceiver) {
    mpsc::unbounded_channel()
}

/// Handle on a running election
///
/// Dropping the handle leaves the re-election loop running for the rest
/// of the process.
pub struct ElectionHandle {
    elected: bool,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ElectionHandle {
    /// Outcome of the first round
    pub fn initially_elected(&self) -> bool {
        self.elected
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Token that stops the re-election loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the re-election loop and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.task
            .await
            .map_err(|e| Error::Internal(format!("re-election loop failed: {}", e)))
    }
}

/// Join the election with an explicit connector and settings.
///
/// Returns after the first round; its error (connect timeout, root
/// bootstrap, path mismatch) is returned as-is and no loop is started.
pub async fn start_with<C: Connector>(
    connector: C,
    settings: ElectionSettings,
    results: LeadershipSender,
) -> Result<ElectionHandle> {
    let mut engine = ElectionEngine::new(connector, settings, results);
    let elected = engine.elect_master().await?;

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(watcher::run(engine, shutdown.clone()));

    Ok(ElectionHandle {
        elected,
        shutdown,
        task,
    })
}

/// Join the election on the ZooKeeper ensemble named by `target`
/// (`host1:port1[,host2:port2,...][/namespace]`) with default settings.
pub async fn start(target: &str, results: LeadershipSender) -> Result<ElectionHandle> {
    let settings = ElectionSettings::from_target(target)?;
    start_with(ZooKeeperConnector::new(), settings, results).await
}
