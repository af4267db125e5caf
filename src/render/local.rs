//! Filesystem-backed rendering service.
//!
//! Serves images from a directory tree, one subdirectory per image id:
//!
//! ```text
//! <root>/
//! ├── 101/                  single-resolution image
//! │   ├── z0_t0.png
//! │   └── z1_t0.png
//! └── 102/                  pyramid image, level 0 = finest
//!     ├── z0_t0_l0.tif
//!     ├── z0_t0_l1.tif
//!     └── z0_t0_l2.tif
//! ```
//!
//! The pyramid is detected from the `z0_t0_l*` files. Sessions are kept in an
//! in-memory directory so the orchestrator can reuse them across tiles.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RenderError;

use super::backend::{RegionRequest, RenderSession, RenderingService, SessionDirectory};

/// Plane file extensions, in lookup order.
pub const PLANE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

// =============================================================================
// Session
// =============================================================================

/// A session bound to one image directory.
///
/// Cloning yields another handle to the same session.
#[derive(Debug, Clone)]
pub struct LocalSession {
    inner: Arc<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    id: u64,
    image_id: String,
    image_dir: PathBuf,
    closed: AtomicBool,
}

impl LocalSession {
    /// Unique id of this session within its service.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether [`RenderSession::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSession for LocalSession {
    fn bound_image_id(&self) -> &str {
        &self.inner.image_id
    }

    async fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!(session = self.inner.id, image_id = %self.inner.image_id, "Closed session");
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Rendering service over a local directory of plane images.
pub struct LocalRenderingService {
    root: PathBuf,
    sessions: RwLock<Vec<LocalSession>>,
    next_session_id: AtomicU64,
}

impl LocalRenderingService {
    /// Create a service rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: RwLock::new(Vec::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Directory of an image, or `None` if the id cannot name one.
    fn image_dir(&self, image_id: &str) -> Option<PathBuf> {
        let valid = !image_id.is_empty()
            && image_id != "."
            && image_id != ".."
            && !image_id.contains(['/', '\\']);
        valid.then(|| self.root.join(image_id))
    }

    /// List image ids available under the root.
    pub async fn list_images(&self) -> Result<Vec<String>, RenderError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| RenderError::Backend(format!("{}: {}", self.root.display(), e)))?;

        let mut images = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                images.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        images.sort();
        Ok(images)
    }
}

#[async_trait]
impl SessionDirectory for LocalRenderingService {
    type Session = LocalSession;

    async fn active_sessions(&self) -> Vec<LocalSession> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|s| !s.is_closed());
        sessions.clone()
    }
}

#[async_trait]
impl RenderingService for LocalRenderingService {
    async fn prepare_session(&self, image_id: &str) -> Result<Option<LocalSession>, RenderError> {
        let Some(image_dir) = self.image_dir(image_id) else {
            return Ok(None);
        };

        let exists = tokio::fs::metadata(&image_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !exists {
            return Ok(None);
        }

        let session = LocalSession {
            inner: Arc::new(SessionState {
                id: self.next_session_id.fetch_add(1, Ordering::SeqCst),
                image_id: image_id.to_string(),
                image_dir,
                closed: AtomicBool::new(false),
            }),
        };

        debug!(session = session.id(), image_id, "Prepared session");
        self.sessions.write().await.push(session.clone());

        Ok(Some(session))
    }

    async fn pyramid_levels(&self, image_id: &str) -> Result<Vec<u32>, RenderError> {
        let image_dir = self
            .image_dir(image_id)
            .ok_or_else(|| RenderError::NotFound(image_id.to_string()))?;
        let id = image_id.to_string();

        tokio::task::spawn_blocking(move || read_level_widths(&image_dir, &id))
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?
    }

    async fn render_region(
        &self,
        session: &LocalSession,
        region: &RegionRequest,
    ) -> Result<Option<Bytes>, RenderError> {
        if session.is_closed() {
            return Err(RenderError::SessionClosed);
        }

        let image_dir = session.inner.image_dir.clone();
        let region = *region;

        tokio::task::spawn_blocking(move || render_plane_region(&image_dir, &region))
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?
    }
}

// =============================================================================
// Blocking helpers
// =============================================================================

fn plane_stem(plane_z: u32, timepoint: u32, level: Option<usize>) -> String {
    match level {
        Some(level) => format!("z{}_t{}_l{}", plane_z, timepoint, level),
        None => format!("z{}_t{}", plane_z, timepoint),
    }
}

fn find_plane(image_dir: &Path, stem: &str) -> Option<PathBuf> {
    PLANE_EXTENSIONS
        .iter()
        .map(|ext| image_dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
}

fn read_level_widths(image_dir: &Path, image_id: &str) -> Result<Vec<u32>, RenderError> {
    if !image_dir.is_dir() {
        return Err(RenderError::NotFound(image_id.to_string()));
    }

    let mut widths = Vec::new();
    for level in 0.. {
        let Some(path) = find_plane(image_dir, &plane_stem(0, 0, Some(level))) else {
            break;
        };
        let (width, _) = image::image_dimensions(&path)
            .map_err(|e| RenderError::Backend(format!("{}: {}", path.display(), e)))?;
        widths.push(width);
    }

    Ok(widths)
}

fn render_plane_region(
    image_dir: &Path,
    region: &RegionRequest,
) -> Result<Option<Bytes>, RenderError> {
    let stem = plane_stem(region.plane_z, region.timepoint, region.level);
    let Some(path) = find_plane(image_dir, &stem) else {
        return Ok(None);
    };

    let plane =
        image::open(&path).map_err(|e| RenderError::Backend(format!("{}: {}", path.display(), e)))?;

    // Clamp the region to the plane bounds.
    let x = region.origin_x.max(0.0).floor() as u32;
    let y = region.origin_y.max(0.0).floor() as u32;
    if x >= plane.width() || y >= plane.height() {
        return Ok(None);
    }
    let width = region.width.min(plane.width() - x);
    let height = region.height.min(plane.height() - y);
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let crop = plane.crop_imm(x, y, width, height).to_rgb8();
    let quality = (region.compression * 100.0).round().clamp(1.0, 100.0) as u8;

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality)
        .encode_image(&crop)
        .map_err(|e| RenderError::Backend(e.to_string()))?;

    Ok(Some(Bytes::from(output)))
}
