//! Viewer navigation over the current media session

use crate::session::{ItemAccess, RequestId, SessionManager, SessionUpdate};
use app_fs::MediaEntry;
use thiserror::Error;
use tracing::debug;

/// Items from the loaded edge at which the next page is requested early
pub const DEFAULT_READ_AHEAD_MARGIN: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    #[error("viewer is not open")]
    NotOpen,

    #[error("no directory selected")]
    NoSession,

    #[error("directory has no media")]
    Empty,

    #[error("media for this directory is unavailable")]
    Unavailable,

    /// The viewer is bound to a session that is no longer current
    #[error("viewer is bound to session {bound}, current is {current}")]
    SessionMismatch { bound: RequestId, current: RequestId },
}

/// What the viewer shows
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerFrame {
    pub index: usize,
    pub total: usize,
    /// `None` while the item is still loading
    pub item: Option<MediaEntry>,
}

impl ViewerFrame {
    pub fn is_placeholder(&self) -> bool {
        self.item.is_none()
    }
}

/// Fullscreen viewer state bound to one session
#[derive(Debug)]
pub struct ViewerNavigator {
    is_open: bool,
    current_index: usize,
    session_id: Option<RequestId>,
    current_item: Option<MediaEntry>,
    read_ahead_margin: usize,
}

impl Default for ViewerNavigator {
    fn default() -> Self {
        Self::new(DEFAULT_READ_AHEAD_MARGIN)
    }
}

impl ViewerNavigator {
    pub fn new(read_ahead_margin: usize) -> Self {
        Self {
            is_open: false,
            current_index: 0,
            session_id: None,
            current_item: None,
            read_ahead_margin,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_item(&self) -> Option<&MediaEntry> {
        self.current_item.as_ref()
    }

    pub fn session_id(&self) -> Option<RequestId> {
        self.session_id
    }

    /// Open on `index`, clamped into the session's known range
    pub fn open_at(
        &mut self,
        sessions: &mut SessionManager,
        index: usize,
    ) -> Result<ViewerFrame, ViewerError> {
        let session = sessions.current();
        if session.path().is_none() {
            return Err(ViewerError::NoSession);
        }
        if session.error().is_some() {
            return Err(ViewerError::Unavailable);
        }
        if session.is_done() && session.items().is_empty() {
            return Err(ViewerError::Empty);
        }

        let index = index.min(session.total().saturating_sub(1));
        self.is_open = true;
        self.session_id = Some(session.request_id());
        debug!("Viewer opened at {} (session {})", index, session.request_id());

        self.show(sessions, index)
    }

    /// Move one item towards `delta`'s sign; no wraparound
    pub fn step(
        &mut self,
        sessions: &mut SessionManager,
        delta: isize,
    ) -> Result<ViewerFrame, ViewerError> {
        self.check_bound(sessions)?;

        let total = sessions.current().total();
        let last = total.saturating_sub(1);
        let target = match delta.signum() {
            1 => (self.current_index + 1).min(last),
            -1 => self.current_index.saturating_sub(1),
            _ => self.current_index,
        };

        if target == self.current_index {
            return Ok(self.frame(total));
        }

        self.show(sessions, target)
    }

    /// Reset to closed; calling it again is harmless
    pub fn close(&mut self) {
        if self.is_open {
            debug!("Viewer closed at {}", self.current_index);
        }
        self.is_open = false;
        self.current_index = 0;
        self.session_id = None;
        self.current_item = None;
    }

    /// Fill in a placeholder once its page has arrived.
    ///
    /// Returns the new frame when what the viewer shows changed.
    pub fn on_session_pages_appended(
        &mut self,
        sessions: &SessionManager,
        update: &SessionUpdate,
    ) -> Option<ViewerFrame> {
        let SessionUpdate::PageAppended { request_id, .. } = update else {
            return None;
        };
        if !self.is_open || self.session_id != Some(*request_id) {
            return None;
        }

        let session = sessions.current();
        if session.request_id() != *request_id {
            return None;
        }

        if self.current_item.is_none() {
            // The estimate may have been too high
            if session.is_done() && self.current_index >= session.items().len() {
                self.current_index = session.items().len().saturating_sub(1);
            }
            if let Some(item) = session.item(self.current_index) {
                self.current_item = Some(item.clone());
                return Some(self.frame(session.total()));
            }
        }

        None
    }

    fn check_bound(&self, sessions: &SessionManager) -> Result<(), ViewerError> {
        if !self.is_open {
            return Err(ViewerError::NotOpen);
        }
        let current = sessions.current().request_id();
        match self.session_id {
            Some(bound) if bound == current => Ok(()),
            Some(bound) => Err(ViewerError::SessionMismatch { bound, current }),
            None => Err(ViewerError::NotOpen),
        }
    }

    fn show(&mut self, sessions: &mut SessionManager, index: usize) -> Result<ViewerFrame, ViewerError> {
        self.current_index = index;
        self.current_item = match sessions.ensure_loaded(index) {
            ItemAccess::Ready(item) => Some(item),
            ItemAccess::Pending { .. } => None,
            ItemAccess::OutOfRange => {
                let last = sessions.current().items().len().saturating_sub(1);
                self.current_index = last;
                sessions.current().item(last).cloned()
            }
            ItemAccess::Unavailable => return Err(ViewerError::Unavailable),
        };

        sessions.prefetch_near(self.current_index, self.read_ahead_margin);
        Ok(self.frame(sessions.current().total()))
    }

    fn frame(&self, total: usize) -> ViewerFrame {
        ViewerFrame {
            index: self.current_index,
            total,
            item: self.current_item.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MediaPageFetcher;
    use crate::testing::MemoryFetcher;
    use app_fs::LeafDirectory;
    use std::path::Path;
    use std::sync::Arc;

    async fn loaded(count: usize, page_size: usize) -> (Arc<MemoryFetcher>, SessionManager) {
        let fetcher = Arc::new(MemoryFetcher::new().with_directory("/a", count));
        let dyn_fetcher: Arc<dyn MediaPageFetcher> = fetcher.clone();
        let mut sessions = SessionManager::new(Some(dyn_fetcher), page_size).with_auto_paging(false);
        sessions.select(&LeafDirectory::new("/a", "a", count));
        sessions.settle().await;
        (fetcher, sessions)
    }

    #[tokio::test]
    async fn test_step_is_noop_at_boundaries() {
        let (fetcher, mut sessions) = loaded(5, 120).await;
        let mut viewer = ViewerNavigator::default();

        let frame = viewer.open_at(&mut sessions, 0).unwrap();
        assert_eq!(frame.index, 0);
        let calls = fetcher.calls().len();

        let frame = viewer.step(&mut sessions, -1).unwrap();
        assert_eq!(frame.index, 0);

        viewer.open_at(&mut sessions, 4).unwrap();
        let frame = viewer.step(&mut sessions, 1).unwrap();
        assert_eq!(frame.index, 4);
        assert_eq!(frame.item.unwrap().name, "img_0004.jpg");

        assert_eq!(fetcher.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_open_clamps_index() {
        let (_, mut sessions) = loaded(5, 120).await;
        let mut viewer = ViewerNavigator::default();

        let frame = viewer.open_at(&mut sessions, 99).unwrap();
        assert_eq!(frame.index, 4);
        assert!(!frame.is_placeholder());
    }

    #[tokio::test]
    async fn test_open_unloaded_shows_placeholder() {
        let (fetcher, mut sessions) = loaded(30, 10).await;
        let mut viewer = ViewerNavigator::default();

        let frame = viewer.open_at(&mut sessions, 15).unwrap();
        assert!(frame.is_placeholder());
        assert_eq!(frame.total, 30);

        let mut shown = None;
        while let Some(update) = sessions.next_update().await {
            if let Some(frame) = viewer.on_session_pages_appended(&sessions, &update) {
                shown = Some(frame);
            }
        }

        assert_eq!(fetcher.calls_for(Path::new("/a")).len(), 2);
        let shown = shown.expect("placeholder filled");
        assert_eq!(shown.index, 15);
        assert_eq!(shown.item.unwrap().name, "img_0015.jpg");
    }

    #[tokio::test]
    async fn test_step_reads_ahead_near_edge() {
        let (fetcher, mut sessions) = loaded(30, 10).await;
        let mut viewer = ViewerNavigator::default();

        viewer.open_at(&mut sessions, 6).unwrap();
        assert_eq!(fetcher.calls().len(), 1);

        let frame = viewer.step(&mut sessions, 1).unwrap();
        assert_eq!(frame.index, 7);
        assert!(!frame.is_placeholder());
        sessions.settle().await;
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(sessions.current().items().len(), 20);
    }

    #[tokio::test]
    async fn test_refuses_after_reselection() {
        let (_, mut sessions) = loaded(5, 120).await;
        let mut viewer = ViewerNavigator::default();
        viewer.open_at(&mut sessions, 1).unwrap();

        sessions.select(&LeafDirectory::new("/a", "a", 5));
        let err = viewer.step(&mut sessions, 1).unwrap_err();
        assert!(matches!(err, ViewerError::SessionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_, mut sessions) = loaded(5, 120).await;
        let mut viewer = ViewerNavigator::default();
        viewer.open_at(&mut sessions, 2).unwrap();

        viewer.close();
        viewer.close();
        assert!(!viewer.is_open());
        assert!(viewer.current_item().is_none());
        assert_eq!(viewer.step(&mut sessions, 1), Err(ViewerError::NotOpen));
    }

    #[test]
    fn test_open_without_session() {
        let mut sessions = SessionManager::new(None, 10);
        let mut viewer = ViewerNavigator::default();
        assert_eq!(viewer.open_at(&mut sessions, 0), Err(ViewerError::NoSession));
    }
}
