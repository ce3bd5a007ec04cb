//! Opening files and folders with the OS shell

use serde::Serialize;
use std::path::Path;

/// Result of a fire-and-forget shell action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpenOutcome {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Open a file with its default application
pub fn open_file(path: &Path) -> OpenOutcome {
    if !path.is_file() {
        return OpenOutcome::failed(format!("File not found: {}", path.display()));
    }
    launch(path)
}

/// Open a folder in the system file manager; files open their containing folder
pub fn open_folder(path: &Path) -> OpenOutcome {
    let folder = if path.is_dir() {
        path
    } else {
        match path.parent() {
            Some(parent) if parent.is_dir() => parent,
            _ => return OpenOutcome::failed(format!("Folder not found: {}", path.display())),
        }
    };
    launch(folder)
}

#[cfg(feature = "open-external")]
fn launch(path: &Path) -> OpenOutcome {
    match open::that_detached(path) {
        Ok(()) => {
            tracing::info!("Opened: {}", path.display());
            OpenOutcome::ok()
        }
        Err(e) => {
            tracing::warn!("Failed to open {}: {}", path.display(), e);
            OpenOutcome::failed(e.to_string())
        }
    }
}

#[cfg(not(feature = "open-external"))]
fn launch(path: &Path) -> OpenOutcome {
    OpenOutcome::failed(format!("Shell integration disabled: {}", path.display()))
}
