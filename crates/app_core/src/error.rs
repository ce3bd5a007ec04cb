//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Capability unavailable: {0}")]
    MissingCapability(&'static str),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown directory: {0}")]
    UnknownDirectory(String),

    #[error("Viewer: {0}")]
    Viewer(#[from] crate::navigation::ViewerError),

    #[error("Storage error: {0}")]
    Storage(String),

    // ===== Fatal Errors (application termination) =====
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Config(_) | AppError::Init(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::FileNotFound(path) => format!("File not found: {}", path),
            AppError::AccessDenied(path) => format!("Access denied: {}", path),
            AppError::ImageDecode(msg) => format!("Cannot load image: {}", msg),
            AppError::Fetch(e) => e.user_message(),
            AppError::MissingCapability(what) => {
                format!("{} is not available in this environment.", what)
            }
            _ => self.to_string(),
        }
    }
}

/// Why a page of media could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No page fetcher was provided
    #[error("media listing is not available")]
    Unavailable,

    /// The fetcher failed outright
    #[error("{0}")]
    Failed(String),

    /// The fetcher answered, but with an error instead of a page
    #[error("{0}")]
    Reported(String),
}

impl FetchError {
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Unavailable => "Media listing is not available.".to_string(),
            FetchError::Failed(msg) | FetchError::Reported(msg) => {
                format!("Could not load media: {}", msg)
            }
        }
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::NotFound(p) => AppError::FileNotFound(p),
            app_fs::FsError::AccessDenied(p) => AppError::AccessDenied(p),
            app_fs::FsError::Io(e) => AppError::Io(e),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<app_db::DbError> for AppError {
    fn from(e: app_db::DbError) -> Self {
        match e {
            app_db::DbError::NotFound(msg) => AppError::FileNotFound(msg),
            _ => AppError::Database(e.to_string()),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::ImageDecode(e.to_string())
    }
}
