//! The process-wide running flag (§5, Design Notes: "Process-wide running
//! flag"): a single shared atomic boolean, set by SIGINT/SIGTERM, by
//! remote-control `shutdown`/`restart`, or by a plugin's critical return
//! code. It is the only object cancellation points read — no true global is
//! used. Grounded on `eisenbahn::worker::WorkerRunner`'s signal handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Spawn a task that clears the flag on SIGINT/SIGTERM.
    pub fn install_signal_handlers(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            os_signal().await;
            tracing::info!("shutdown signal received");
            flag.stop();
        });
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

async fn os_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl_c");
    }
}

/// The restart flag: set alongside clearing the running flag by the
/// `restart` remote command, or by plugin-host logic that decides a restart
/// is warranted. Checked once the cooperative loop exits.
#[derive(Debug, Clone)]
pub struct RestartFlag(Arc<AtomicBool>);

impl RestartFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for RestartFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_flag_starts_true_and_stop_clears_it() {
        let flag = RunningFlag::new();
        assert!(flag.is_running());
        flag.stop();
        assert!(!flag.is_running());
    }

    #[test]
    fn restart_flag_starts_clear() {
        let flag = RestartFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn running_flag_clone_shares_state() {
        let flag = RunningFlag::new();
        let clone = flag.clone();
        clone.stop();
        assert!(!flag.is_running());
    }
}
