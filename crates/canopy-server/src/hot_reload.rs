use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Represents a change below a watched pages directory
#[derive(Debug, Clone)]
pub struct PagesChange {
    pub path: PathBuf,
}

/// Watcher that reports pages directory changes
pub struct PagesWatcher {
    tx: broadcast::Sender<PagesChange>,
    _watcher: notify::RecommendedWatcher,
}

impl PagesWatcher {
    /// Create a new watcher over `watch_paths`
    pub fn new(watch_paths: Vec<PathBuf>) -> Result<Self> {
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    // Renames show up as modify events
                    if !matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    for path in event.paths {
                        debug!("Pages changed: {:?}", path);
                        // Ignore if no receivers
                        let _ = tx_clone.send(PagesChange { path });
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            }
        })?;

        for path in watch_paths {
            if path.exists() {
                watcher.watch(&path, RecursiveMode::Recursive)?;
                info!("Watching: {:?}", path);
            } else {
                warn!("Path does not exist: {:?}", path);
            }
        }

        Ok(Self {
            tx,
            _watcher: watcher,
        })
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<PagesChange> {
        self.tx.subscribe()
    }
}
