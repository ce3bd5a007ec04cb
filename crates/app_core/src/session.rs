//! Media session management
//!
//! A session is one paginated load of a leaf directory. Pages are fetched
//! strictly one at a time on spawned tasks; completions come back over a
//! channel and are applied by [`SessionManager::handle`], which drops anything
//! whose request id no longer matches the current session.

use crate::collaborators::{MediaPageFetcher, PageRequest};
use crate::error::FetchError;
use app_fs::{LeafDirectory, MediaEntry, MediaPage};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Session identity; allocated from a counter and never reused
pub type RequestId = u64;

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 120;

/// Lifecycle of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Done,
    Failed(FetchError),
    Superseded,
}

/// Coarse view of a session for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    HasPages,
    Done,
    Error,
    Superseded,
}

/// One paginated load of a single directory
#[derive(Debug)]
pub struct MediaSession {
    request_id: RequestId,
    path: Option<PathBuf>,
    total: usize,
    next_offset: usize,
    items: Vec<MediaEntry>,
    loading: bool,
    status: SessionStatus,
    pending_index: Option<usize>,
    cancel: CancellationToken,
}

impl MediaSession {
    fn idle(request_id: RequestId) -> Self {
        Self {
            request_id,
            path: None,
            total: 0,
            next_offset: 0,
            items: Vec::new(),
            loading: false,
            status: SessionStatus::Active,
            pending_index: None,
            cancel: CancellationToken::new(),
        }
    }

    fn for_directory(request_id: RequestId, leaf: &LeafDirectory) -> Self {
        Self {
            path: Some(leaf.path.clone()),
            total: leaf.media_file_count,
            ..Self::idle(request_id)
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Target directory, `None` while idle
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Best known item count
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn next_offset(&self) -> usize {
        self.next_offset
    }

    pub fn items(&self) -> &[MediaEntry] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&MediaEntry> {
        self.items.get(index)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Terminal: finished, failed or superseded
    pub fn is_done(&self) -> bool {
        self.status != SessionStatus::Active
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            SessionStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn pending_index(&self) -> Option<usize> {
        self.pending_index
    }

    /// Token for rendering work tied to this session
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.path.is_none() {
            return match self.status {
                SessionStatus::Superseded => SessionPhase::Superseded,
                _ => SessionPhase::Idle,
            };
        }

        match self.status {
            SessionStatus::Superseded => SessionPhase::Superseded,
            SessionStatus::Failed(_) => SessionPhase::Error,
            SessionStatus::Done => SessionPhase::Done,
            SessionStatus::Active if self.items.is_empty() => SessionPhase::Loading,
            SessionStatus::Active => SessionPhase::HasPages,
        }
    }

    fn supersede(&mut self) {
        self.status = SessionStatus::Superseded;
        self.pending_index = None;
        self.cancel.cancel();
    }

    fn finish(&mut self) {
        self.status = SessionStatus::Done;
        self.total = self.items.len();
        self.pending_index = None;
    }

    fn fail(&mut self, error: FetchError) {
        self.status = SessionStatus::Failed(error);
        self.pending_index = None;
    }
}

/// Completion of one page fetch
#[derive(Debug)]
pub struct PageEvent {
    pub request_id: RequestId,
    pub offset: usize,
    pub result: Result<MediaPage, FetchError>,
}

/// Answer to a random-access request
#[derive(Debug, Clone, PartialEq)]
pub enum ItemAccess {
    Ready(MediaEntry),
    /// Not loaded yet; `total` is the best known count for sizing a placeholder
    Pending { index: usize, total: usize },
    /// Past the end of a finished session
    OutOfRange,
    /// No directory selected, or the session failed
    Unavailable,
}

/// What applying a page event did
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Response for a session that is no longer current; nothing changed
    Stale { request_id: RequestId },
    PageAppended {
        request_id: RequestId,
        range: Range<usize>,
        total: usize,
        done: bool,
        /// A pending random-access index that this page made available
        resolved: Option<(usize, MediaEntry)>,
    },
    Failed { request_id: RequestId, error: FetchError },
}

/// Owns the current session and drives its page fetches
pub struct SessionManager {
    fetcher: Option<Arc<dyn MediaPageFetcher>>,
    page_size: usize,
    auto_paging: bool,
    next_request_id: RequestId,
    current: MediaSession,
    events_tx: mpsc::UnboundedSender<PageEvent>,
    events_rx: mpsc::UnboundedReceiver<PageEvent>,
}

impl SessionManager {
    pub fn new(fetcher: Option<Arc<dyn MediaPageFetcher>>, page_size: usize) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
            auto_paging: true,
            next_request_id: 1,
            current: MediaSession::idle(0),
            events_tx,
            events_rx,
        }
    }

    /// When disabled, pages past the first load only on demand
    pub fn with_auto_paging(mut self, auto_paging: bool) -> Self {
        self.auto_paging = auto_paging;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current(&self) -> &MediaSession {
        &self.current
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    fn replace_current(&mut self, fresh: MediaSession) -> MediaSession {
        let mut previous = std::mem::replace(&mut self.current, fresh);
        previous.supersede();
        previous
    }

    /// Start a new session for `leaf` and request its first page.
    ///
    /// Returns the superseded session. Must be called inside a tokio runtime.
    pub fn select(&mut self, leaf: &LeafDirectory) -> MediaSession {
        let request_id = self.allocate_id();
        let previous = self.replace_current(MediaSession::for_directory(request_id, leaf));

        info!(
            "Session {} started for {} (estimated {} items)",
            request_id,
            leaf.path.display(),
            leaf.media_file_count
        );

        self.request_page();
        previous
    }

    /// Drop the current session and go idle
    pub fn deselect(&mut self) -> MediaSession {
        let request_id = self.allocate_id();
        let previous = self.replace_current(MediaSession::idle(request_id));
        debug!("Session {} deselected", previous.request_id);
        previous
    }

    /// Request the next sequential page unless one is already in flight.
    ///
    /// Returns whether a request was issued.
    pub fn load_more(&mut self) -> bool {
        self.request_page()
    }

    fn request_page(&mut self) -> bool {
        let session = &mut self.current;
        if session.loading || session.is_done() {
            return false;
        }
        let Some(path) = session.path.clone() else {
            return false;
        };

        session.loading = true;
        let request_id = session.request_id;
        let request = PageRequest::new(session.next_offset, self.page_size);
        let tx = self.events_tx.clone();

        let Some(fetcher) = self.fetcher.clone() else {
            // Goes through the same completion path as a failed fetch
            let _ = tx.send(PageEvent {
                request_id,
                offset: request.offset,
                result: Err(FetchError::Unavailable),
            });
            return true;
        };

        trace!(
            "Session {} fetching offset {} limit {:?}",
            request_id,
            request.offset,
            request.limit
        );

        tokio::spawn(async move {
            let fetch = tokio::spawn(async move { fetcher.list_page(&path, request).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Failed(format!("page fetch task failed: {}", e))),
            };
            let _ = tx.send(PageEvent {
                request_id,
                offset: request.offset,
                result,
            });
        });

        true
    }

    /// Random access to item `index`.
    ///
    /// Unloaded indices are recorded as pending and trigger the next
    /// sequential page if nothing is in flight.
    pub fn ensure_loaded(&mut self, index: usize) -> ItemAccess {
        let session = &mut self.current;
        if session.path.is_none() || session.error().is_some() {
            return ItemAccess::Unavailable;
        }
        if let Some(item) = session.items.get(index) {
            return ItemAccess::Ready(item.clone());
        }
        if session.is_done() {
            return ItemAccess::OutOfRange;
        }

        session.pending_index = Some(index);
        let total = session.total;
        if !session.loading {
            self.request_page();
        }

        ItemAccess::Pending { index, total }
    }

    /// Read-ahead: fetch the next page when `index` is within `margin` of the loaded edge
    pub fn prefetch_near(&mut self, index: usize, margin: usize) -> bool {
        let session = &self.current;
        if session.loading || session.is_done() || session.path.is_none() {
            return false;
        }
        if index.saturating_add(margin).saturating_add(1) < session.items.len() {
            return false;
        }
        self.request_page()
    }

    /// Apply one fetch completion to the current session
    pub fn handle(&mut self, event: PageEvent) -> SessionUpdate {
        if event.request_id != self.current.request_id {
            trace!("Dropping response for superseded session {}", event.request_id);
            return SessionUpdate::Stale {
                request_id: event.request_id,
            };
        }

        let session = &mut self.current;
        let request_id = session.request_id;
        session.loading = false;

        if session.is_done() {
            return SessionUpdate::Stale { request_id };
        }

        let page = match event.result {
            Ok(MediaPage { error: Some(message), .. }) => Err(FetchError::Reported(message)),
            other => other,
        };

        let page = match page {
            Ok(page) => page,
            Err(error) => {
                warn!("Session {} failed: {}", request_id, error);
                session.fail(error.clone());
                return SessionUpdate::Failed { request_id, error };
            }
        };

        if event.offset != session.next_offset {
            warn!(
                "Session {} got page at offset {}, expected {}",
                request_id, event.offset, session.next_offset
            );
        }

        let start = session.items.len();
        let received = page.files.len();
        session.items.extend(page.files);

        session.next_offset = start + received;
        if page.next_offset > session.next_offset {
            debug!(
                "Session {} ignoring reported next offset {} past received items",
                request_id, page.next_offset
            );
        }
        session.total = session.total.max(session.next_offset).max(page.total);

        let has_more = page.has_more.unwrap_or(session.next_offset < session.total);
        if !has_more {
            session.finish();
        } else if received == 0 {
            warn!(
                "Session {} received an empty page at offset {}, stopping",
                request_id, event.offset
            );
            session.finish();
        }

        let resolved = match session.pending_index {
            Some(index) if index < session.items.len() => {
                session.pending_index = None;
                Some((index, session.items[index].clone()))
            }
            _ => None,
        };

        let update = SessionUpdate::PageAppended {
            request_id,
            range: start..session.items.len(),
            total: session.total,
            done: session.is_done(),
            resolved,
        };

        debug!(
            "Session {} has {}/{} items{}",
            request_id,
            session.items.len(),
            session.total,
            if session.is_done() { " (done)" } else { "" }
        );

        // The follow-up page is only queued here; its result is applied by a later call.
        if !session.is_done() && (self.auto_paging || session.pending_index.is_some()) {
            self.request_page();
        }

        update
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` when the current session has nothing in flight.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if !self.current.loading {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Apply completions until the current session is idle
    pub async fn settle(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }
}
