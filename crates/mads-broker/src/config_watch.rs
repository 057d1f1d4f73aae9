//! Watch-triggered reload (§4.4): a file watcher observes the configuration
//! file and, on modification, injects an `x` (reload) into the terminal
//! input stream so the broker re-execs with a fresh configuration. The
//! file-watcher plumbing itself (notify's OS-native backend) is a commodity
//! dependency, not bespoke code, matching the stance this component takes
//! on out-of-scope collaborators.

use std::path::Path;
use std::sync::mpsc;

pub use mads_core::exepath::reexec_self;
use mads_core::error::{MadsError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<std::result::Result<Event, notify::Error>>,
}

impl ConfigWatcher {
    pub fn watch(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(|e| MadsError::Config(format!("failed to create config watcher: {e}")))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| MadsError::Config(format!("failed to watch {}: {e}", path.display())))?;

        Ok(Self { _watcher: watcher, rx })
    }

    /// Non-blocking poll: `true` if the watched file was modified since the
    /// last poll.
    pub fn poll_modified(&self) -> bool {
        let mut modified = false;
        while let Ok(Ok(event)) = self.rx.try_recv() {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                modified = true;
            }
        }
        modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn watcher_detects_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mads.toml");
        std::fs::write(&path, "[agents]\n").unwrap();

        let watcher = ConfigWatcher::watch(&path).unwrap();
        assert!(!watcher.poll_modified());

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "# touched").unwrap();
        f.sync_all().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(watcher.poll_modified());
    }
}
