//! Application state management
//!
//! `AppState` is the single owner of everything the front end mutates: the
//! current leaf set, derived tags, the exclusion list, the media session and
//! the viewer. Operations take `&mut self`; nothing is shared across threads.

use crate::collaborators::Collaborators;
use crate::image_loader::{ImageLoader, LoadedMedia};
use crate::navigation::{ViewerError, ViewerFrame, ViewerNavigator};
use crate::session::{MediaSession, RequestId, SessionManager, SessionUpdate};
use crate::tags::{derive_tags, renderable_tags, ExclusionList, ExclusionStore, Tag, TagIndex, TagSortMode};
use crate::{AppConfig, AppError};
use app_fs::{LeafDirectory, LibraryWatcher, ListOptions, OpenOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A session update together with what it did to the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub update: SessionUpdate,
    /// Set when a viewer placeholder was filled in
    pub viewer: Option<ViewerFrame>,
}

/// Main application state
pub struct AppState {
    config: AppConfig,
    collaborators: Collaborators,
    root: Option<PathBuf>,
    leaves: Vec<LeafDirectory>,
    exclusions: ExclusionList,
    tag_index: TagIndex,
    tag_query: String,
    sort_mode: TagSortMode,
    sessions: SessionManager,
    viewer: ViewerNavigator,
    watcher: Option<LibraryWatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, collaborators: Collaborators, exclusion_store: Arc<dyn ExclusionStore>) -> Self {
        let config = config.sanitized();
        let sessions = SessionManager::new(collaborators.page_fetcher.clone(), config.session.page_size)
            .with_auto_paging(config.session.auto_paging);

        Self {
            viewer: ViewerNavigator::new(config.viewer.read_ahead_margin),
            sort_mode: config.tags.sort_mode,
            exclusions: ExclusionList::load(exclusion_store),
            collaborators,
            root: None,
            leaves: Vec::new(),
            tag_index: TagIndex::default(),
            tag_query: String::new(),
            sessions,
            watcher: None,
            config,
        }
    }

    /// State backed by the local filesystem and the system shell
    pub fn with_filesystem(config: AppConfig, exclusion_store: Arc<dyn ExclusionStore>) -> Self {
        let options = ListOptions {
            show_hidden: config.library.show_hidden,
            follow_symlinks: config.library.follow_symlinks,
        };
        Self::new(config, Collaborators::filesystem(options), exclusion_store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn leaves(&self) -> &[LeafDirectory] {
        &self.leaves
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tag_index
    }

    pub fn excluded_tags(&self) -> Vec<String> {
        self.exclusions.set().to_vec()
    }

    pub fn tag_query(&self) -> &str {
        &self.tag_query
    }

    pub fn sort_mode(&self) -> TagSortMode {
        self.sort_mode
    }

    pub fn session(&self) -> &MediaSession {
        self.sessions.current()
    }

    pub fn viewer(&self) -> &ViewerNavigator {
        &self.viewer
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Scan `root` and make its leaves the current set.
    ///
    /// A failed scan is logged and leaves the library empty. Returns the
    /// number of leaves found.
    pub async fn load_root(&mut self, root: &Path) -> Result<usize, AppError> {
        let leaves = self.scan(root).await?;
        let count = leaves.len();

        self.sessions.deselect();
        self.viewer.close();
        self.root = Some(root.to_path_buf());
        self.replace_leaves(leaves);
        self.start_watcher(root);

        info!("Loaded {} leaf directories from {}", count, root.display());
        Ok(count)
    }

    async fn scan(&self, root: &Path) -> Result<Vec<LeafDirectory>, AppError> {
        let scanner = self
            .collaborators
            .scanner
            .as_ref()
            .ok_or(AppError::MissingCapability("Directory scanning"))?;

        match scanner.scan(root).await {
            Ok(leaves) => Ok(leaves),
            Err(e) => {
                warn!("Scan of {} failed, no leaves: {}", root.display(), e);
                Ok(Vec::new())
            }
        }
    }

    fn start_watcher(&mut self, root: &Path) {
        self.watcher = None;
        if !self.config.library.watch {
            return;
        }

        let debounce = Duration::from_millis(self.config.library.watch_debounce_ms);
        match LibraryWatcher::new(root, debounce) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => warn!("Not watching {}: {}", root.display(), e),
        }
    }

    fn replace_leaves(&mut self, leaves: Vec<LeafDirectory>) {
        self.leaves = leaves;
        self.recompute_tags();
    }

    fn recompute_tags(&mut self) {
        self.tag_index = derive_tags(&self.leaves, self.exclusions.set());
        debug!(
            "{} tags from {} leaves ({} excluded keywords)",
            self.tag_index.tags.len(),
            self.leaves.len(),
            self.exclusions.set().len()
        );
    }

    /// Rescan after the watched root changed.
    ///
    /// The session survives only if its directory is still a leaf with the
    /// same media count. Returns whether a rescan happened.
    pub async fn poll_library_changes(&mut self) -> Result<bool, AppError> {
        let Some(watcher) = &self.watcher else {
            return Ok(false);
        };
        let events = watcher.poll_events();
        if events.is_empty() {
            return Ok(false);
        }

        let root = watcher.root().to_path_buf();
        debug!("{} change(s) under {}, rescanning", events.len(), root.display());

        let leaves = self.scan(&root).await?;
        self.invalidate_session_if_changed(&leaves);
        self.replace_leaves(leaves);
        Ok(true)
    }

    fn invalidate_session_if_changed(&mut self, leaves: &[LeafDirectory]) {
        let Some(path) = self.sessions.current().path() else {
            return;
        };
        let before = self.leaves.iter().find(|l| l.path == path);
        let after = leaves.iter().find(|l| l.path == path);

        let unchanged = matches!(
            (before, after),
            (Some(b), Some(a)) if b.media_file_count == a.media_file_count
        );
        if !unchanged {
            info!("Selected directory {} changed on disk", path.display());
            self.deselect_directory();
        }
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Tags after the current query and sort
    pub fn visible_tags(&self) -> Vec<Tag> {
        renderable_tags(&self.tag_index.tags, &self.tag_query, self.sort_mode)
    }

    /// Leaves whose name contains the tag, in leaf order
    pub fn leaves_for_tag(&self, tag_id: &str) -> Vec<&LeafDirectory> {
        let paths: HashSet<&Path> = self
            .tag_index
            .directories_for(tag_id)
            .iter()
            .map(PathBuf::as_path)
            .collect();

        self.leaves
            .iter()
            .filter(|leaf| paths.contains(leaf.path.as_path()))
            .collect()
    }

    /// Hide a keyword from tags; `Ok(false)` if it already was
    pub fn exclude_tag(&mut self, keyword: &str) -> Result<bool, AppError> {
        let changed = self.exclusions.add(keyword)?;
        if changed {
            self.recompute_tags();
        }
        Ok(changed)
    }

    /// Undo [`exclude_tag`](Self::exclude_tag); `Ok(false)` if it was not excluded
    pub fn include_tag(&mut self, keyword: &str) -> Result<bool, AppError> {
        let changed = self.exclusions.remove(keyword)?;
        if changed {
            self.recompute_tags();
        }
        Ok(changed)
    }

    pub fn set_tag_query(&mut self, query: impl Into<String>) {
        self.tag_query = query.into();
    }

    pub fn set_sort_mode(&mut self, mode: TagSortMode) {
        self.sort_mode = mode;
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Start paging `path`; must be one of the current leaves
    pub fn select_directory(&mut self, path: &Path) -> Result<RequestId, AppError> {
        let leaf = self
            .leaves
            .iter()
            .find(|leaf| leaf.path == path)
            .ok_or_else(|| AppError::UnknownDirectory(path.display().to_string()))?;

        self.viewer.close();
        self.sessions.select(leaf);
        Ok(self.sessions.current().request_id())
    }

    pub fn deselect_directory(&mut self) {
        self.viewer.close();
        self.sessions.deselect();
    }

    /// Apply the next page completion; `None` when nothing is in flight
    pub async fn next_session_update(&mut self) -> Option<SessionProgress> {
        let update = self.sessions.next_update().await?;
        let viewer = self.viewer.on_session_pages_appended(&self.sessions, &update);
        Some(SessionProgress { update, viewer })
    }

    /// Apply completions until the session has nothing in flight
    pub async fn settle_session(&mut self) -> Vec<SessionProgress> {
        let mut progress = Vec::new();
        while let Some(step) = self.next_session_update().await {
            progress.push(step);
        }
        progress
    }

    // ========================================================================
    // Viewer
    // ========================================================================

    pub fn open_viewer(&mut self, index: usize) -> Result<ViewerFrame, ViewerError> {
        self.viewer.open_at(&mut self.sessions, index)
    }

    pub fn step_viewer(&mut self, delta: isize) -> Result<ViewerFrame, ViewerError> {
        self.viewer.step(&mut self.sessions, delta)
    }

    pub fn close_viewer(&mut self) {
        self.viewer.close();
    }

    /// Load what the viewer shows; cancelled if the session is replaced meanwhile
    pub async fn load_viewer_media(&self, loader: &ImageLoader) -> Result<LoadedMedia, AppError> {
        let item = self.viewer.current_item().ok_or(ViewerError::NotOpen)?;
        let url = item.file_url.clone();
        let cancel = self.sessions.current().cancel_token();
        loader.load(&url, cancel).await
    }

    // ========================================================================
    // Shell
    // ========================================================================

    /// Open a loaded item of the current session with its default application
    pub fn open_media(&self, index: usize) -> Result<OpenOutcome, AppError> {
        let opener = self
            .collaborators
            .opener
            .as_ref()
            .ok_or(AppError::MissingCapability("Opening files"))?;
        let item = self
            .sessions
            .current()
            .item(index)
            .ok_or(ViewerError::Empty)?;
        Ok(opener.open_file(&item.path))
    }

    /// Show a leaf directory in the system file manager
    pub fn open_leaf(&self, path: &Path) -> Result<OpenOutcome, AppError> {
        let opener = self
            .collaborators
            .opener
            .as_ref()
            .ok_or(AppError::MissingCapability("Opening files"))?;
        if !self.leaves.iter().any(|leaf| leaf.path == path) {
            return Err(AppError::UnknownDirectory(path.display().to_string()));
        }
        Ok(opener.open_folder(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionPhase;
    use crate::tags::MemoryExclusionStore;
    use crate::testing::{MemoryFetcher, MemoryScanner, RecordingOpener};

    struct Harness {
        state: AppState,
        fetcher: Arc<MemoryFetcher>,
        opener: Arc<RecordingOpener>,
        store: Arc<MemoryExclusionStore>,
    }

    fn leaf(path: &str, count: usize) -> LeafDirectory {
        let display = path.trim_start_matches("/lib/");
        LeafDirectory::new(path, display, count)
    }

    fn harness() -> Harness {
        let leaves = vec![
            leaf("/lib/Beach Trip", 3),
            leaf("/lib/Beach Party", 2),
            leaf("/lib/Mountain Trip", 250),
        ];
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_directory("/lib/Beach Trip", 3)
                .with_directory("/lib/Beach Party", 2)
                .with_directory("/lib/Mountain Trip", 250),
        );
        let opener = Arc::new(RecordingOpener::new());
        let store = Arc::new(MemoryExclusionStore::new());

        let collaborators = Collaborators {
            scanner: Some(Arc::new(MemoryScanner::new().with_root("/lib", leaves))),
            page_fetcher: Some(fetcher.clone()),
            opener: Some(opener.clone()),
        };

        let mut config = AppConfig::default();
        config.library.watch = false;
        let state = AppState::new(config, collaborators, store.clone());

        Harness {
            state,
            fetcher,
            opener,
            store,
        }
    }

    fn ids(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_root_derives_tags() {
        let mut h = harness();
        assert_eq!(h.state.load_root(Path::new("/lib")).await.unwrap(), 3);

        assert_eq!(ids(&h.state.visible_tags()), vec!["beach", "trip"]);
        let trips: Vec<_> = h
            .state
            .leaves_for_tag("trip")
            .iter()
            .map(|l| l.display_path.as_str())
            .collect();
        assert_eq!(trips, vec!["Beach Trip", "Mountain Trip"]);

        h.state.set_tag_query("TR");
        assert_eq!(ids(&h.state.visible_tags()), vec!["trip"]);
    }

    #[tokio::test]
    async fn test_failed_scan_yields_no_leaves() {
        let mut h = harness();
        assert_eq!(h.state.load_root(Path::new("/elsewhere")).await.unwrap(), 0);
        assert!(h.state.visible_tags().is_empty());
    }

    #[tokio::test]
    async fn test_exclusion_persists_and_recomputes() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();

        assert!(h.state.exclude_tag("Beach").unwrap());
        assert!(!h.state.exclude_tag("beach").unwrap());
        assert_eq!(ids(&h.state.visible_tags()), vec!["trip"]);
        assert_eq!(h.store.snapshot(), vec!["beach".to_string()]);

        assert!(h.state.include_tag("beach").unwrap());
        assert!(!h.state.include_tag("beach").unwrap());
        assert_eq!(ids(&h.state.visible_tags()), vec!["beach", "trip"]);
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_frequency_sort() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();
        h.state.set_sort_mode(TagSortMode::Frequency);
        assert_eq!(h.state.sort_mode(), TagSortMode::Frequency);
        assert_eq!(ids(&h.state.visible_tags()), vec!["beach", "trip"]);
    }

    #[tokio::test]
    async fn test_select_pages_and_views() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();

        let path = Path::new("/lib/Mountain Trip");
        h.state.select_directory(path).unwrap();
        h.state.settle_session().await;
        assert_eq!(h.state.session().items().len(), 250);
        assert_eq!(h.state.session().phase(), SessionPhase::Done);
        assert_eq!(h.fetcher.calls_for(path).len(), 3);

        let frame = h.state.open_viewer(249).unwrap();
        assert_eq!(frame.item.unwrap().name, "img_0249.jpg");
        assert_eq!(h.state.step_viewer(1).unwrap().index, 249);
        assert_eq!(h.state.step_viewer(-1).unwrap().index, 248);

        h.state.close_viewer();
        assert!(!h.state.viewer().is_open());
    }

    #[tokio::test]
    async fn test_unknown_directory() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();
        let result = h.state.select_directory(Path::new("/lib/Nope"));
        assert!(matches!(result, Err(AppError::UnknownDirectory(_))));
    }

    #[tokio::test]
    async fn test_reselect_closes_viewer() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();

        let first = h.state.select_directory(Path::new("/lib/Beach Trip")).unwrap();
        h.state.settle_session().await;
        h.state.open_viewer(0).unwrap();

        let second = h.state.select_directory(Path::new("/lib/Beach Party")).unwrap();
        assert!(second > first);
        assert!(!h.state.viewer().is_open());
        h.state.settle_session().await;
        assert_eq!(h.state.session().items().len(), 2);

        h.state.deselect_directory();
        assert_eq!(h.state.session().phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_open_actions() {
        let mut h = harness();
        h.state.load_root(Path::new("/lib")).await.unwrap();
        h.state.select_directory(Path::new("/lib/Beach Trip")).unwrap();
        h.state.settle_session().await;

        assert!(h.state.open_media(1).unwrap().success);
        assert!(h.state.open_leaf(Path::new("/lib/Beach Trip")).unwrap().success);
        assert!(h.state.open_media(7).is_err());
        assert_eq!(
            h.opener.opened(),
            vec![
                PathBuf::from("/lib/Beach Trip/img_0001.jpg"),
                PathBuf::from("/lib/Beach Trip"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_capabilities() {
        let mut state = AppState::new(
            AppConfig::default(),
            Collaborators::default(),
            Arc::new(MemoryExclusionStore::new()),
        );

        let result = state.load_root(Path::new("/lib")).await;
        assert!(matches!(result, Err(AppError::MissingCapability(_))));
        assert!(matches!(
            state.open_leaf(Path::new("/lib")),
            Err(AppError::MissingCapability(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_fetcher_fails_session() {
        let leaves = vec![leaf("/lib/Beach Trip", 3)];
        let collaborators = Collaborators {
            scanner: Some(Arc::new(MemoryScanner::new().with_root("/lib", leaves))),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        config.library.watch = false;
        let mut state = AppState::new(config, collaborators, Arc::new(MemoryExclusionStore::new()));

        state.load_root(Path::new("/lib")).await.unwrap();
        state.select_directory(Path::new("/lib/Beach Trip")).unwrap();
        state.settle_session().await;

        assert_eq!(state.session().phase(), SessionPhase::Error);
        assert_eq!(state.open_viewer(0), Err(ViewerError::Unavailable));
    }
}
