//! Media loading and decoding service

use crate::AppError;
use app_fs::{path_from_file_url, MediaKind};
use image::{GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Loads media by URL on a dedicated worker thread
pub struct ImageLoader {
    request_tx: mpsc::UnboundedSender<LoadRequest>,
}

#[derive(Debug)]
struct LoadRequest {
    path: PathBuf,
    max_size: Option<(u32, u32)>,
    cancel: CancellationToken,
    callback: oneshot::Sender<Result<LoadedMedia, AppError>>,
}

/// Loaded media
#[derive(Debug, Clone)]
pub enum LoadedMedia {
    /// Decoded image, RGBA8
    Bitmap {
        path: PathBuf,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
    /// Undecoded bytes for video and anything else
    Raw {
        path: PathBuf,
        kind: MediaKind,
        bytes: Vec<u8>,
    },
}

impl LoadedMedia {
    pub fn path(&self) -> &Path {
        match self {
            LoadedMedia::Bitmap { path, .. } | LoadedMedia::Raw { path, .. } => path,
        }
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();

        std::thread::Builder::new()
            .name("media-loader".into())
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    if request.cancel.is_cancelled() {
                        let _ = request.callback.send(Err(AppError::Cancelled));
                        continue;
                    }
                    let result = Self::load_sync(&request.path, request.max_size);
                    let _ = request.callback.send(result);
                }
            })
            .map(|_| ())
            .unwrap_or_else(|e| tracing::error!("Failed to start media loader thread: {}", e));

        Self { request_tx }
    }

    /// Load the media behind a `file://` URL
    pub async fn load(&self, url: &str, cancel: CancellationToken) -> Result<LoadedMedia, AppError> {
        self.load_scaled(url, None, cancel).await
    }

    /// Like [`load`](Self::load), shrinking bitmaps to fit `max_size`
    pub async fn load_scaled(
        &self,
        url: &str,
        max_size: Option<(u32, u32)>,
        cancel: CancellationToken,
    ) -> Result<LoadedMedia, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let path = path_from_file_url(url)
            .ok_or_else(|| AppError::FileNotFound(format!("not a file URL: {}", url)))?;

        let (tx, rx) = oneshot::channel();
        self.request_tx
            .send(LoadRequest {
                path,
                max_size,
                cancel: cancel.clone(),
                callback: tx,
            })
            .map_err(|_| AppError::Init("media loader is not running".into()))?;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            result = rx => result.map_err(|_| AppError::Init("media loader dropped the request".into()))?,
        };

        // Session may have moved on while decoding
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        result
    }

    fn load_sync(path: &Path, max_size: Option<(u32, u32)>) -> Result<LoadedMedia, AppError> {
        tracing::debug!("Loading media: {}", path.display());

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => AppError::AccessDenied(path.display().to_string()),
            _ => AppError::Io(e),
        })?;

        let kind = MediaKind::from_path(path);
        if kind != MediaKind::Image {
            return Ok(LoadedMedia::Raw {
                path: path.to_path_buf(),
                kind,
                bytes,
            });
        }

        let img = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| AppError::ImageDecode(e.to_string()))?
            .decode()?;

        let img = match max_size {
            Some((max_w, max_h)) => {
                let (w, h) = img.dimensions();
                if w > max_w || h > max_h {
                    img.thumbnail(max_w, max_h)
                } else {
                    img
                }
            }
            None => img,
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(LoadedMedia::Bitmap {
            path: path.to_path_buf(),
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}
