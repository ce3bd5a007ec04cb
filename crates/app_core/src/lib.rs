//! MediaShelf Core Domain Logic
//!
//! This crate contains:
//! - Folder-name tags (tokenizer, aggregation, filter/sort, exclusions)
//! - Collaborator interfaces and their filesystem implementations
//! - Media session management (paged directory loading)
//! - Viewer navigation
//! - Media loading
//! - Directory index building
//! - Configuration and error types
//! - Application state

pub mod state;
pub mod config;
pub mod error;
pub mod tags;
pub mod collaborators;
pub mod session;
pub mod navigation;
pub mod image_loader;
pub mod indexer;
/// In-memory collaborators for tests and embedding
pub mod testing;

pub use state::{AppState, SessionProgress};
pub use config::{AppConfig, IndexConfig, LibraryConfig, SessionConfig, TagConfig, ViewerConfig};
pub use error::{AppError, FetchError};
pub use tags::{
    derive_tags, renderable_tags, tokenize, ExcludedTagSet, ExclusionList, ExclusionStore, Tag,
    TagIndex, TagSortMode, MIN_TAG_OCCURRENCE,
};
pub use collaborators::{
    Collaborators, DirectoryScanner, FsPageFetcher, FsScanner, MediaPageFetcher, PageRequest,
    ShellOpener, SystemOpener,
};
pub use session::{
    ItemAccess, MediaSession, PageEvent, RequestId, SessionManager, SessionPhase, SessionStatus,
    SessionUpdate,
};
pub use navigation::{ViewerError, ViewerFrame, ViewerNavigator};
pub use image_loader::{ImageLoader, LoadedMedia};
pub use indexer::{build_index, index_into, IndexOptions, IndexReport};
