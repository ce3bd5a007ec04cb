//! Library watcher with notify-debouncer-mini

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

/// File system event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FsEvent {
    pub fn path(&self) -> &Path {
        match self {
            FsEvent::Changed(p) | FsEvent::Removed(p) => p,
        }
    }
}

/// Recursive, debounced watcher over one library root
pub struct LibraryWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    event_rx: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    root: PathBuf,
}

impl LibraryWatcher {
    /// Start watching `root` and everything below it
    pub fn new(root: &Path, debounce: Duration) -> Result<Self, notify::Error> {
        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(debounce, tx)?;
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        tracing::info!("Watching: {}", root.display());

        Ok(Self {
            debouncer,
            event_rx: rx,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drain pending events without blocking
    pub fn poll_events(&self) -> Vec<FsEvent> {
        let mut events = Vec::new();

        while let Ok(result) = self.event_rx.try_recv() {
            match result {
                Ok(debounced) => events.extend(debounced.into_iter().filter_map(Self::convert_event)),
                Err(e) => tracing::warn!("Watcher error: {:?}", e),
            }
        }

        events.sort_by(|a, b| a.path().cmp(b.path()));
        events.dedup();
        events
    }

    fn convert_event(event: DebouncedEvent) -> Option<FsEvent> {
        use notify_debouncer_mini::DebouncedEventKind;

        match event.kind {
            DebouncedEventKind::Any if event.path.exists() => Some(FsEvent::Changed(event.path)),
            DebouncedEventKind::Any => Some(FsEvent::Removed(event.path)),
            _ => None,
        }
    }
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) {
        let _ = self.debouncer.watcher().unwatch(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_creation() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = LibraryWatcher::new(dir.path(), Duration::from_millis(50)).unwrap();
        assert_eq!(watcher.root(), dir.path());
        assert!(watcher.poll_events().is_empty());
    }
}
