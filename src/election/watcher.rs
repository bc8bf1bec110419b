//! Re-election loop
//!
//! Watches the leader marker and runs a new election round whenever it
//! disappears. Watches are one-shot, so every cycle installs a fresh one.
//! Failures are logged and the loop carries on; only the shutdown token
//! ends it.

use crate::common::Error;
use crate::coordination::{Connector, WatchEvent, WatchEventType};
use crate::election::engine::ElectionEngine;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why the loop woke up
enum Wake {
    Event(WatchEvent),
    /// The marker was missing when the watch was installed
    Vacant,
    /// The watch could not be installed; back-off elapsed
    Retry,
}

pub(crate) async fn run<C: Connector>(mut engine: ElectionEngine<C>, shutdown: CancellationToken) {
    let retry_interval = engine.settings().retry_interval;
    let marker = engine.settings().paths.marker();

    loop {
        let wake = match engine.watch_marker().await {
            Ok(watch) => tokio::select! {
                _ = shutdown.cancelled() => break,
                event = watch => Wake::Event(event),
            },
            Err(Error::NoNode(_)) => Wake::Vacant,
            Err(e) => {
                tracing::warn!(
                    "Watch children error on {}: {}, retrying in {:?}",
                    marker,
                    e,
                    retry_interval
                );
                if !pause(&shutdown, retry_interval).await {
                    break;
                }
                Wake::Retry
            }
        };

        match wake {
            Wake::Event(event) if event.event_type == WatchEventType::NodeDeleted => {
                tracing::info!("Receive znode delete event: {}", event);
            }
            Wake::Event(event) => {
                tracing::debug!("Ignoring watch event: {}", event);
                continue;
            }
            // the last claim failed yet nobody holds the marker
            Wake::Vacant if engine.claim_faulted() => {
                tracing::warn!(
                    "Leader marker {} is vacant after a failed claim, retrying in {:?}",
                    marker,
                    retry_interval
                );
                if !pause(&shutdown, retry_interval).await {
                    break;
                }
            }
            Wake::Vacant => tracing::info!("Leader marker {} is vacant", marker),
            Wake::Retry => {}
        }

        tracing::info!("Start electing new master ...");
        match engine.elect_master().await {
            Ok(elected) => tracing::debug!(
                "Re-election finished: elected={}, state={}",
                elected,
                engine.state()
            ),
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!("Elect new master error: {}", e);
                } else {
                    tracing::error!("Elect new master error: {}", e);
                }
                if !pause(&shutdown, retry_interval).await {
                    break;
                }
            }
        }
    }

    tracing::info!("Re-election loop stopped");
}

/// Sleep for `interval`; `false` when shutdown was requested meanwhile
async fn pause(shutdown: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}
