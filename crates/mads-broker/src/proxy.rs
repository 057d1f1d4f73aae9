//! The broker's XSUB↔XPUB forwarding proxy (C4).
//!
//! Since the `zeromq` crate has no native XPUB/XSUB socket type, the proxy
//! is emulated with a SUB frontend (bound, subscribed to everything) and a
//! PUB backend (bound), exactly as `eisenbahn::broker::EventBroker` already
//! does for its own pub/sub fabric.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mads_core::error::{MadsError, Result};
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket};

use crate::stats::ProxyStats;
use crate::steering::Verb;

const RECV_POLL_MS: u64 = 100;
const PAUSED_POLL_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct ProxyEndpoints {
    pub frontend: String,
    pub backend: String,
}

/// Running mode: daemon exits only via signal; steerable additionally
/// accepts PAUSE/RESUME/TERMINATE/STATISTICS verbs from a steering channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Daemon,
    Steerable,
}

pub struct EventProxy {
    endpoints: ProxyEndpoints,
    mode: ProxyMode,
    stats: Arc<ProxyStats>,
    paused: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    reload: Arc<AtomicBool>,
}

impl EventProxy {
    pub fn new(endpoints: ProxyEndpoints, mode: ProxyMode) -> Self {
        Self {
            endpoints,
            mode,
            stats: Arc::new(ProxyStats::default()),
            paused: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(true)),
            reload: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stats(&self) -> Arc<ProxyStats> {
        self.stats.clone()
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn reload_requested(&self) -> bool {
        self.reload.load(Ordering::SeqCst)
    }

    /// Apply a steering verb. Only meaningful in [`ProxyMode::Steerable`].
    pub fn apply(&self, verb: Verb) {
        match verb {
            Verb::Pause => self.paused.store(true, Ordering::SeqCst),
            Verb::Resume => self.paused.store(false, Ordering::SeqCst),
            Verb::Terminate => self.running.store(false, Ordering::SeqCst),
            Verb::Statistics => {}
        }
    }

    /// Set the reload flag and stop the proxy loop; the caller is
    /// responsible for re-executing the process afterwards.
    pub fn request_reload(&self) {
        self.reload.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn run(&self) -> Result<()> {
        let mut frontend = SubSocket::new();
        frontend
            .bind(&self.endpoints.frontend)
            .await
            .map_err(MadsError::Zmq)?;
        frontend.subscribe("").await.map_err(MadsError::Zmq)?;
        tracing::info!(endpoint = %self.endpoints.frontend, "broker frontend (SUB) bound");

        let mut backend = PubSocket::new();
        backend
            .bind(&self.endpoints.backend)
            .await
            .map_err(MadsError::Zmq)?;
        tracing::info!(endpoint = %self.endpoints.backend, "broker backend (PUB) bound");

        loop {
            if !self.is_running() {
                tracing::info!("proxy terminating");
                break;
            }
            if self.is_paused() {
                tokio::time::sleep(Duration::from_millis(PAUSED_POLL_MS)).await;
                continue;
            }

            let recv = tokio::time::timeout(
                Duration::from_millis(RECV_POLL_MS),
                frontend.recv(),
            )
            .await;

            let msg = match recv {
                Ok(Ok(msg)) => msg,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "frontend recv error");
                    continue;
                }
                Err(_) => continue,
            };

            let byte_size: u64 = msg.iter().map(|f| f.len() as u64).sum();
            self.stats.record_front_in(byte_size);

            if let Err(e) = backend.send(msg).await {
                tracing::warn!(error = %e, "backend send error");
                continue;
            }
            self.stats.record_back_out(byte_size);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_proxy_starts_running_and_unpaused() {
        let proxy = EventProxy::new(
            ProxyEndpoints {
                frontend: "tcp://127.0.0.1:0".into(),
                backend: "tcp://127.0.0.1:0".into(),
            },
            ProxyMode::Steerable,
        );
        assert!(proxy.is_running());
        assert!(!proxy.is_paused());
        assert!(!proxy.reload_requested());
    }

    #[test]
    fn apply_pause_then_resume_has_no_inverted_meaning() {
        let proxy = EventProxy::new(
            ProxyEndpoints {
                frontend: "tcp://127.0.0.1:0".into(),
                backend: "tcp://127.0.0.1:0".into(),
            },
            ProxyMode::Steerable,
        );
        proxy.apply(Verb::Pause);
        assert!(proxy.is_paused());
        proxy.apply(Verb::Resume);
        assert!(!proxy.is_paused());
    }

    #[test]
    fn apply_terminate_stops_running() {
        let proxy = EventProxy::new(
            ProxyEndpoints {
                frontend: "tcp://127.0.0.1:0".into(),
                backend: "tcp://127.0.0.1:0".into(),
            },
            ProxyMode::Daemon,
        );
        proxy.apply(Verb::Terminate);
        assert!(!proxy.is_running());
    }

    #[test]
    fn request_reload_sets_reload_and_stops_running() {
        let proxy = EventProxy::new(
            ProxyEndpoints {
                frontend: "tcp://127.0.0.1:0".into(),
                backend: "tcp://127.0.0.1:0".into(),
            },
            ProxyMode::Steerable,
        );
        proxy.request_reload();
        assert!(proxy.reload_requested());
        assert!(!proxy.is_running());
    }
}
