//! File watching for live reload.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Capacity of the event queue between the watcher and its consumer.
const QUEUE_CAPACITY: usize = 256;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Modified => write!(f, "Changed"),
            Self::Removed => write!(f, "Removed"),
        }
    }
}

/// One filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// File watcher feeding a bounded event queue.
///
/// Events stop when the watcher is dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively.
    ///
    /// Returns the watcher and the receiving end of its event queue.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(QUEUE_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!("Not watching missing path {}", path.display());
            }
        }

        // notify delivers on its own thread; forward into the async queue.
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in &event.paths {
                    if let Some(watch_event) = classify_event(path, &event.kind) {
                        if async_tx.blocking_send(watch_event).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event; access and metadata-only events are ignored.
fn classify_event(path: &Path, kind: &EventKind) -> Option<WatchEvent> {
    let kind = match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return None,
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return None,
    };

    Some(WatchEvent {
        path: path.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn classifies_event_kinds() {
        use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind};
        let path = Path::new("slides.md");

        assert_eq!(
            classify_event(path, &EventKind::Create(CreateKind::File)).map(|e| e.kind),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            classify_event(path, &EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .map(|e| e.kind),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            classify_event(
                path,
                &EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))
            ),
            None
        );
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("slides.md");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "## Created").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        let event = event.expect("timeout waiting for file watch event");
        let event = event.expect("channel should not be closed");
        assert_eq!(event.path.file_name(), test_file.file_name());
    }
}
