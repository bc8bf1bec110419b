//! Coordination service client boundary
//!
//! The election engine only needs a handful of operations from the
//! coordination service: open a session, check a node, create a node and
//! watch a node's children. [`Connector`] and [`Session`] express that
//! surface; [`zookeeper`] implements it against a real ensemble and
//! [`memory`] against an in-process namespace.

pub mod memory;
pub mod zookeeper;

use crate::common::Result;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;

pub use memory::{MemoryConnector, MemoryService, MemorySession};
pub use zookeeper::{ZooKeeperConnector, ZooKeeperSession};

/// Connectivity of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    ConnectedReadOnly,
    Expired,
    Closed,
}

impl SessionState {
    /// Can this session still issue writes?
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::ConnectedReadOnly => write!(f, "connected-read-only"),
            SessionState::Expired => write!(f, "expired"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Lifetime of a created node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Survives the creating session
    Persistent,
    /// Removed by the service when the creating session ends
    Ephemeral,
}

/// Kind of change reported by a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
    /// Session-level notification (disconnect, expiry)
    Session,
}

/// One-shot watch notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub session_state: SessionState,
    pub path: String,
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} on {} (session {})",
            self.event_type, self.path, self.session_state
        )
    }
}

/// Pending watch; resolves once with the first change after installation
pub type Watch = BoxFuture<'static, WatchEvent>;

/// Opens sessions against a coordination service cluster
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    /// Resolve once a session is connected. Callers bound the wait.
    async fn connect(&self, endpoints: &[String]) -> Result<Self::Session>;
}

/// A live session; ephemeral nodes it creates share its lifetime
#[async_trait]
pub trait Session: Send + Sync + 'static {
    fn state(&self) -> SessionState;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create `path`, returning the path the service reports as created.
    /// Fails with `Error::NodeExists` when the node is already present.
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String>;

    /// Current children of `path` plus a one-shot watch on it.
    /// Fails with `Error::NoNode` when `path` does not exist.
    async fn watch_children(&self, path: &str) -> Result<(Vec<String>, Watch)>;
}
