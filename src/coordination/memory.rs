//! In-process coordination service
//!
//! A single shared namespace with the session semantics the election relies
//! on: ephemeral nodes vanish with their session, creates are
//! create-if-absent under one lock, and watches fire once. Faults (an
//! unreachable cluster, expired sessions, a service that echoes the wrong
//! path) can be injected to exercise the failure paths.

use crate::common::{Error, Result};
use crate::coordination::{
    Connector, CreateMode, Session, SessionState, Watch, WatchEvent, WatchEventType,
};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

#[derive(Debug)]
struct Node {
    data: Vec<u8>,
    ephemeral_owner: Option<u64>,
}

struct PendingWatch {
    session_id: u64,
    tx: oneshot::Sender<WatchEvent>,
}

#[derive(Default)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    sessions: HashMap<u64, SessionState>,
    next_session_id: u64,
    watches: HashMap<String, Vec<PendingWatch>>,
    create_calls: HashMap<String, usize>,
    path_rewrites: HashMap<String, String>,
    unreachable: bool,
}

impl Inner {
    fn session_state(&self, id: u64) -> SessionState {
        self.sessions
            .get(&id)
            .copied()
            .unwrap_or(SessionState::Closed)
    }

    fn node_exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn children(&self, path: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|candidate| parent_of(candidate) == path)
            .filter_map(|candidate| candidate.rsplit('/').next())
            .map(str::to_string)
            .collect()
    }

    fn fire(&mut self, path: &str, event_type: WatchEventType) {
        let Some(pending) = self.watches.remove(path) else {
            return;
        };
        for watch in pending {
            let state = self.session_state(watch.session_id);
            let _ = watch.tx.send(WatchEvent {
                event_type,
                session_state: state,
                path: path.to_string(),
            });
        }
    }

    fn remove_node(&mut self, path: &str) {
        if self.nodes.remove(path).is_some() {
            self.fire(path, WatchEventType::NodeDeleted);
            let parent = parent_of(path).to_string();
            self.fire(&parent, WatchEventType::NodeChildrenChanged);
        }
    }

    fn end_session(&mut self, id: u64, state: SessionState) {
        self.sessions.insert(id, state);

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.ephemeral_owner == Some(id))
            .map(|(path, _)| path.clone())
            .collect();
        for path in owned {
            self.remove_node(&path);
        }

        // watches held by the dead session hear about it once
        for pending in self.watches.values_mut() {
            let (mine, others): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|w| w.session_id == id);
            *pending = others;
            for watch in mine {
                let _ = watch.tx.send(WatchEvent {
                    event_type: WatchEventType::Session,
                    session_state: state,
                    path: String::new(),
                });
            }
        }
        self.watches.retain(|_, pending| !pending.is_empty());
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

/// Shared in-memory namespace; clones observe the same state
#[derive(Clone, Default)]
pub struct MemoryService {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connector that opens sessions against this namespace
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            service: self.clone(),
        }
    }

    /// Does `path` exist right now?
    pub fn contains(&self, path: &str) -> bool {
        self.lock().node_exists(path)
    }

    /// Session owning the ephemeral node at `path`, if any
    pub fn ephemeral_owner(&self, path: &str) -> Option<u64> {
        self.lock().nodes.get(path).and_then(|n| n.ephemeral_owner)
    }

    /// Payload stored at `path`
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().nodes.get(path).map(|n| n.data.clone())
    }

    /// Number of create calls issued for `path`, successful or not
    pub fn create_calls(&self, path: &str) -> usize {
        self.lock().create_calls.get(path).copied().unwrap_or(0)
    }

    /// Number of sessions ever opened
    pub fn sessions_opened(&self) -> u64 {
        self.lock().next_session_id
    }

    /// Number of watches waiting to fire
    pub fn pending_watches(&self) -> usize {
        self.lock().watches.values().map(Vec::len).sum()
    }

    /// Remove a node as an outside party would. Nodes with children stay.
    pub fn delete(&self, path: &str) -> Result<()> {
        let mut inner = self.lock();
        if !inner.nodes.contains_key(path) {
            return Err(Error::NoNode(path.to_string()));
        }
        if !inner.children(path).is_empty() {
            return Err(Error::Coordination(format!("node not empty: {}", path)));
        }
        inner.remove_node(path);
        Ok(())
    }

    /// Expire a session: its ephemeral nodes are removed and watchers notified
    pub fn expire_session(&self, id: u64) {
        self.lock().end_session(id, SessionState::Expired);
    }

    /// Drop connectivity of a session without ending it
    pub fn disconnect_session(&self, id: u64) {
        let mut inner = self.lock();
        if inner.session_state(id).is_connected() {
            inner.sessions.insert(id, SessionState::Disconnected);
        }
    }

    /// While unreachable, connects never complete
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make creates of `path` report `reported` as the created path
    pub fn rewrite_created_path(&self, path: &str, reported: &str) {
        self.lock()
            .path_rewrites
            .insert(path.to_string(), reported.to_string());
    }
}

/// Opens [`MemorySession`]s
#[derive(Clone)]
pub struct MemoryConnector {
    service: MemoryService,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, _endpoints: &[String]) -> Result<MemorySession> {
        let unreachable = self.service.lock().unreachable;
        if unreachable {
            futures_util::future::pending::<()>().await;
        }

        let mut inner = self.service.lock();
        inner.next_session_id += 1;
        let id = inner.next_session_id;
        inner.sessions.insert(id, SessionState::Connected);

        Ok(MemorySession {
            id,
            service: self.service.clone(),
        })
    }
}

/// Session against a [`MemoryService`]
pub struct MemorySession {
    id: u64,
    service: MemoryService,
}

impl MemorySession {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn live(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.service.lock();
        match inner.session_state(self.id) {
            SessionState::Connected => Ok(inner),
            state => Err(Error::Coordination(format!(
                "session {} is {}",
                self.id, state
            ))),
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn state(&self) -> SessionState {
        self.service.lock().session_state(self.id)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.live()?.node_exists(path))
    }

    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        let mut inner = self.live()?;
        *inner.create_calls.entry(path.to_string()).or_default() += 1;

        if inner.node_exists(path) {
            return Err(Error::NodeExists(path.to_string()));
        }
        let parent = parent_of(path).to_string();
        if !inner.node_exists(&parent) {
            return Err(Error::NoNode(parent));
        }
        if inner
            .nodes
            .get(&parent)
            .is_some_and(|node| node.ephemeral_owner.is_some())
        {
            return Err(Error::Coordination(format!(
                "ephemeral node cannot have children: {}",
                parent
            )));
        }

        let ephemeral_owner = match mode {
            CreateMode::Persistent => None,
            CreateMode::Ephemeral => Some(self.id),
        };
        inner.nodes.insert(
            path.to_string(),
            Node {
                data: data.to_vec(),
                ephemeral_owner,
            },
        );
        inner.fire(&parent, WatchEventType::NodeChildrenChanged);

        Ok(inner
            .path_rewrites
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_string()))
    }

    async fn watch_children(&self, path: &str) -> Result<(Vec<String>, Watch)> {
        let mut inner = self.live()?;
        if !inner.node_exists(path) {
            return Err(Error::NoNode(path.to_string()));
        }

        let children = inner.children(path);
        let (tx, rx) = oneshot::channel();
        inner
            .watches
            .entry(path.to_string())
            .or_default()
            .push(PendingWatch {
                session_id: self.id,
                tx,
            });

        let path = path.to_string();
        let watch = async move {
            rx.await.unwrap_or(WatchEvent {
                event_type: WatchEventType::Session,
                session_state: SessionState::Closed,
                path,
            })
        }
        .boxed();

        Ok((children, watch))
    }
}
