//! Common utilities and types shared across zkelect

pub mod config;
pub mod error;
pub mod target;
pub mod utils;

pub use config::{
    Config, ElectionPaths, ElectionSettings, DEFAULT_MASTER_PATH, DEFAULT_ROOT_PATH,
};
pub use error::{Error, Result};
pub use target::ConnectionTarget;
pub use utils::{duration_millis, join_path, normalize_path, parse_duration};
