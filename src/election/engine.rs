//! Election engine
//!
//! One participant's view of the election. A round runs
//! `ensure_session → ensure_root → claim_leadership`:
//!
//! ```text
//! Disconnected → Connecting → RootPending → RootReady → Elected | Standby
//! ```
//!
//! The marker node is created ephemeral, so the coordination service
//! removes it when the owning session ends and at most one create can
//! succeed at a time. The engine adds no locking of its own.
//!
//! Rounds take `&mut self` and therefore never overlap within a process.

use crate::common::utils::ancestors;
use crate::common::{ElectionSettings, Error, Result};
use crate::coordination::{Connector, CreateMode, Session, Watch};
use crate::election::LeadershipSender;
use std::fmt;

/// Where the engine is in its current round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionState {
    Disconnected,
    Connecting,
    /// Connected, root node not yet confirmed
    RootPending,
    /// Connected, root node present
    RootReady,
    Elected,
    Standby,
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionState::Disconnected => write!(f, "disconnected"),
            ElectionState::Connecting => write!(f, "connecting"),
            ElectionState::RootPending => write!(f, "root-pending"),
            ElectionState::RootReady => write!(f, "root-ready"),
            ElectionState::Elected => write!(f, "elected"),
            ElectionState::Standby => write!(f, "standby"),
        }
    }
}

/// Election state machine owning the session to the coordination service
pub struct ElectionEngine<C: Connector> {
    connector: C,
    settings: ElectionSettings,
    session: Option<C::Session>,
    state: ElectionState,
    /// Last claim failed with something other than losing the race
    claim_faulted: bool,
    results: LeadershipSender,
}

impl<C: Connector> ElectionEngine<C> {
    pub fn new(connector: C, settings: ElectionSettings, results: LeadershipSender) -> Self {
        Self {
            connector,
            settings,
            session: None,
            state: ElectionState::Disconnected,
            claim_faulted: false,
            results,
        }
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    /// Did the last claim fail for a reason other than an existing marker?
    pub fn claim_faulted(&self) -> bool {
        self.claim_faulted
    }

    pub fn settings(&self) -> &ElectionSettings {
        &self.settings
    }

    pub fn session(&self) -> Option<&C::Session> {
        self.session.as_ref()
    }

    /// Is the current session (if any) connected?
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.state().is_connected())
    }

    fn live_session(&self) -> Result<&C::Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::Internal("no coordination session".into()))
    }

    /// Reuse a connected session or open a new one, waiting at most the
    /// connect timeout for it.
    pub async fn ensure_session(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        if let Some(stale) = self.session.take() {
            tracing::info!(
                "Coordination session is {}, reconnecting",
                stale.state()
            );
        }

        self.state = ElectionState::Connecting;
        let timeout = self.settings.connect_timeout;
        let connect = self.connector.connect(self.settings.target.endpoints());

        let outcome = tokio::time::timeout(timeout, connect).await;

        match outcome {
            Ok(Ok(session)) => {
                tracing::info!(
                    "Connected to coordination service {}",
                    self.settings.target
                );
                self.session = Some(session);
                self.state = ElectionState::RootPending;
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ElectionState::Disconnected;
                Err(e)
            }
            Err(_) => {
                self.state = ElectionState::Disconnected;
                Err(Error::ConnectTimeout(timeout))
            }
        }
    }

    /// Make sure the root namespace node exists as a permanent node
    pub async fn ensure_root(&mut self) -> Result<()> {
        let root = self.settings.paths.root().to_string();
        let session = self.live_session()?;

        if !session.exists(&root).await? {
            for ancestor in ancestors(&root) {
                if !session.exists(&ancestor).await? {
                    create_persistent(session, &ancestor).await?;
                }
            }
            create_persistent(session, &root).await?;
            tracing::info!("Created election root {}", root);
        }

        self.state = ElectionState::RootReady;
        Ok(())
    }

    /// Try to create the ephemeral leader marker and publish the outcome.
    ///
    /// Losing the create race is an outcome, not an error: it publishes
    /// `false`. Only a path mismatch from the service is returned as an
    /// error, and then nothing is published.
    pub async fn claim_leadership(&mut self) -> Result<bool> {
        let marker = self.settings.paths.marker();
        let session = self.live_session()?;

        let created = session
            .create(
                &marker,
                self.settings.node_id.as_bytes(),
                CreateMode::Ephemeral,
            )
            .await;

        let elected = match created {
            Ok(path) => {
                check_created_path(&marker, path)?;
                tracing::info!(
                    "Elect master success: {} holds {}",
                    self.settings.node_id,
                    marker
                );
                true
            }
            Err(Error::NodeExists(_)) => {
                tracing::info!("Elect master failure: {} is already held", marker);
                false
            }
            Err(e) => {
                tracing::warn!("Elect master failure: {}", e);
                self.claim_faulted = true;
                self.state = ElectionState::Standby;
                self.publish(false);
                return Ok(false);
            }
        };

        self.claim_faulted = false;
        self.state = if elected {
            ElectionState::Elected
        } else {
            ElectionState::Standby
        };
        self.publish(elected);
        Ok(elected)
    }

    /// Run one election round. Session and root failures abort the round
    /// before any outcome is published.
    pub async fn elect_master(&mut self) -> Result<bool> {
        self.ensure_session().await?;
        self.ensure_root().await?;
        self.claim_leadership().await
    }

    /// Watch the leader marker for its next change
    pub async fn watch_marker(&self) -> Result<Watch> {
        let marker = self.settings.paths.marker();
        let session = self.live_session()?;
        let (children, watch) = session.watch_children(&marker).await?;
        tracing::debug!(
            "Watching {} (children={:?}, session {})",
            marker,
            children,
            session.state()
        );
        Ok(watch)
    }

    fn publish(&self, elected: bool) {
        if self.results.send(elected).is_err() {
            tracing::warn!("Leadership receiver dropped, outcome {} discarded", elected);
        }
    }
}

async fn create_persistent<S: Session>(session: &S, path: &str) -> Result<()> {
    match session.create(path, &[], CreateMode::Persistent).await {
        Ok(created) => check_created_path(path, created),
        Err(Error::NodeExists(_)) => {
            tracing::debug!("{} created concurrently by another participant", path);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn check_created_path(expected: &str, actual: String) -> Result<()> {
    if actual != expected {
        return Err(Error::ProtocolInvariant {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
