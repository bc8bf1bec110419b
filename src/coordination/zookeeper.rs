//! ZooKeeper backend

use crate::common::{Error, Result};
use crate::coordination::{
    Connector, CreateMode, Session, SessionState, Watch, WatchEvent, WatchEventType,
};
use async_trait::async_trait;
use futures_util::FutureExt;
use zookeeper_client as zk;

/// Client port used for endpoints given without one
pub const DEFAULT_PORT: u16 = 2181;

/// Connection string for a set of endpoints, filling in the default port
pub fn cluster_string(endpoints: &[String]) -> String {
    endpoints
        .iter()
        .map(|endpoint| {
            if endpoint.contains(':') {
                endpoint.clone()
            } else {
                format!("{}:{}", endpoint, DEFAULT_PORT)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Opens sessions against a ZooKeeper ensemble
#[derive(Debug, Clone, Default)]
pub struct ZooKeeperConnector;

impl ZooKeeperConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for ZooKeeperConnector {
    type Session = ZooKeeperSession;

    async fn connect(&self, endpoints: &[String]) -> Result<ZooKeeperSession> {
        let cluster = cluster_string(endpoints);
        let client = zk::Client::connect(&cluster)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", cluster, e)))?;
        Ok(ZooKeeperSession { client })
    }
}

/// Live ZooKeeper session
pub struct ZooKeeperSession {
    client: zk::Client,
}

#[async_trait]
impl Session for ZooKeeperSession {
    fn state(&self) -> SessionState {
        session_state(self.client.state())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let stat = self
            .client
            .check_stat(path)
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(stat.is_some())
    }

    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        let mode = match mode {
            CreateMode::Persistent => zk::CreateMode::Persistent,
            CreateMode::Ephemeral => zk::CreateMode::Ephemeral,
        };
        let options = mode.with_acls(zk::Acls::anyone_all());

        self.client
            .create(path, data, &options)
            .await
            .map_err(|e| map_error(path, e))?;

        // non-sequential creates land exactly at the requested path
        Ok(path.to_string())
    }

    async fn watch_children(&self, path: &str) -> Result<(Vec<String>, Watch)> {
        let (children, _stat, watcher) = self
            .client
            .get_and_watch_children(path)
            .await
            .map_err(|e| map_error(path, e))?;

        let watch = async move {
            let event = watcher.changed().await;
            WatchEvent {
                event_type: event_type(event.event_type),
                session_state: session_state(event.session_state),
                path: event.path,
            }
        }
        .boxed();

        Ok((children, watch))
    }
}

fn map_error(path: &str, err: zk::Error) -> Error {
    match err {
        zk::Error::NodeExists => Error::NodeExists(path.to_string()),
        zk::Error::NoNode => Error::NoNode(path.to_string()),
        err => Error::Coordination(format!("{}: {}", path, err)),
    }
}

#[allow(unreachable_patterns)]
fn session_state(state: zk::SessionState) -> SessionState {
    match state {
        zk::SessionState::SyncConnected => SessionState::Connected,
        zk::SessionState::ConnectedReadOnly => SessionState::ConnectedReadOnly,
        zk::SessionState::Disconnected => SessionState::Disconnected,
        zk::SessionState::Expired => SessionState::Expired,
        _ => SessionState::Closed,
    }
}

#[allow(unreachable_patterns)]
fn event_type(event_type: zk::EventType) -> WatchEventType {
    match event_type {
        zk::EventType::NodeCreated => WatchEventType::NodeCreated,
        zk::EventType::NodeDeleted => WatchEventType::NodeDeleted,
        zk::EventType::NodeDataChanged => WatchEventType::NodeDataChanged,
        zk::EventType::NodeChildrenChanged => WatchEventType::NodeChildrenChanged,
        _ => WatchEventType::Session,
    }
}
