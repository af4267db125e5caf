//! Test utilities for integration tests.
//!
//! This module provides a mock rendering backend with call tracking and helpers
//! for building routers, issuing requests and populating local image trees.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageFormat, ImageReader, Luma, Rgb, RgbImage};
use tokio::sync::RwLock;
use tower::ServiceExt;

use pyramid_tiler::error::RenderError;
use pyramid_tiler::render::{RegionRequest, RenderSession, RenderingService, SessionDirectory};
use pyramid_tiler::tile::TileService;
use pyramid_tiler::{create_router, RouterConfig};

// =============================================================================
// Mock Session
// =============================================================================

/// A session handle that records whether it was closed.
#[derive(Clone)]
pub struct MockSession {
    image_id: String,
    closed: Arc<AtomicBool>,
    close_count: Arc<AtomicUsize>,
}

impl MockSession {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSession for MockSession {
    fn bound_image_id(&self) -> &str {
        &self.image_id
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// =============================================================================
// Mock Rendering Service
// =============================================================================

/// How a mock image answers render calls.
#[derive(Debug, Clone)]
pub enum MockImage {
    /// Renders gray JPEGs; empty widths means no pyramid
    Renders { level_widths: Vec<u32> },

    /// Render calls succeed but return nothing
    Empty { level_widths: Vec<u32> },

    /// Render calls fail with a backend error
    Failing,
}

/// A mock rendering backend that tracks every call.
pub struct MockRenderingService {
    images: HashMap<String, MockImage>,
    sessions: RwLock<Vec<MockSession>>,
    regions: RwLock<Vec<RegionRequest>>,
    prepare_count: AtomicUsize,
    render_count: AtomicUsize,
    close_count: Arc<AtomicUsize>,
    reclaim_next_render: AtomicBool,
}

impl MockRenderingService {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            sessions: RwLock::new(Vec::new()),
            regions: RwLock::new(Vec::new()),
            prepare_count: AtomicUsize::new(0),
            render_count: AtomicUsize::new(0),
            close_count: Arc::new(AtomicUsize::new(0)),
            reclaim_next_render: AtomicBool::new(false),
        }
    }

    /// Add an image that renders successfully.
    pub fn with_image(self, image_id: impl Into<String>, level_widths: &[u32]) -> Self {
        self.with_mock_image(
            image_id,
            MockImage::Renders {
                level_widths: level_widths.to_vec(),
            },
        )
    }

    pub fn with_mock_image(mut self, image_id: impl Into<String>, image: MockImage) -> Self {
        self.images.insert(image_id.into(), image);
        self
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_count.load(Ordering::SeqCst)
    }

    pub fn render_count(&self) -> usize {
        self.render_count.load(Ordering::SeqCst)
    }

    /// Number of sessions that have been closed.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Every region passed to `render_region`, in call order.
    pub async fn rendered_regions(&self) -> Vec<RegionRequest> {
        self.regions.read().await.clone()
    }

    /// Close the session used by the next render call just before it renders.
    pub fn reclaim_next_render(&self) {
        self.reclaim_next_render.store(true, Ordering::SeqCst);
    }
}

impl Default for MockRenderingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionDirectory for MockRenderingService {
    type Session = MockSession;

    async fn active_sessions(&self) -> Vec<MockSession> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|s| !s.is_closed());
        sessions.clone()
    }
}

#[async_trait]
impl RenderingService for MockRenderingService {
    async fn prepare_session(&self, image_id: &str) -> Result<Option<MockSession>, RenderError> {
        self.prepare_count.fetch_add(1, Ordering::SeqCst);

        if !self.images.contains_key(image_id) {
            return Ok(None);
        }

        let session = MockSession {
            image_id: image_id.to_string(),
            closed: Arc::new(AtomicBool::new(false)),
            close_count: Arc::clone(&self.close_count),
        };
        self.sessions.write().await.push(session.clone());
        Ok(Some(session))
    }

    async fn pyramid_levels(&self, image_id: &str) -> Result<Vec<u32>, RenderError> {
        match self.images.get(image_id) {
            Some(MockImage::Renders { level_widths }) | Some(MockImage::Empty { level_widths }) => {
                Ok(level_widths.clone())
            }
            Some(MockImage::Failing) => Ok(Vec::new()),
            None => Err(RenderError::NotFound(image_id.to_string())),
        }
    }

    async fn render_region(
        &self,
        session: &MockSession,
        region: &RegionRequest,
    ) -> Result<Option<Bytes>, RenderError> {
        self.render_count.fetch_add(1, Ordering::SeqCst);
        self.regions.write().await.push(*region);

        if self.reclaim_next_render.swap(false, Ordering::SeqCst) {
            session.close().await;
        }
        if session.is_closed() {
            return Err(RenderError::SessionClosed);
        }

        match self.images.get(session.bound_image_id()) {
            Some(MockImage::Renders { .. }) => Ok(Some(Bytes::from(create_test_jpeg(
                region.width,
                region.height,
                90,
            )))),
            Some(MockImage::Empty { .. }) => Ok(None),
            Some(MockImage::Failing) => Err(RenderError::Backend(
                "renderer crashed".to_string(),
            )),
            None => Err(RenderError::NotFound(session.bound_image_id().to_string())),
        }
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Build a router over a shared backend, with tracing disabled.
pub fn build_router<B>(backend: Arc<B>) -> Router
where
    B: RenderingService + 'static,
{
    let tile_service = TileService::with_shared_backend(backend, "1");
    create_router(tile_service, RouterConfig::new().with_tracing(false))
}

/// Issue a GET request against the router.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Read a header as a string.
pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .unwrap()
}

/// Build a tile URI with every field set.
pub fn tile_uri(route: &str, image_id: &str, x: f64, y: f64, size: u32, zoom: u32) -> String {
    format!(
        "/{}/{}/?z=0&t=0&x={}&y={}&w={}&h={}&zm={}&quality=80",
        route, image_id, x, y, size, size, zoom
    )
}

// =============================================================================
// Image Helpers
// =============================================================================

/// Create a grayscale test JPEG.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&img)
        .unwrap();
    buf
}

/// Write an RGB plane file under `dir`.
pub fn write_plane(dir: &Path, name: &str, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    img.save(dir.join(name)).unwrap();
}

/// Check that data starts with the JPEG SOI marker and ends with EOI.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4
        && data[0] == 0xFF
        && data[1] == 0xD8
        && data[data.len() - 2] == 0xFF
        && data[data.len() - 1] == 0xD9
}

/// Dimensions of an encoded JPEG.
pub fn jpeg_dimensions(data: &[u8]) -> (u32, u32) {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg)
        .into_dimensions()
        .unwrap()
}
