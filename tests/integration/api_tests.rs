//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Welcome and health endpoints
//! - Tile retrieval on both tile routes, with and without trailing slash
//! - Request parsing errors and their JSON bodies
//! - Backend failures mapped to HTTP status codes

use std::sync::Arc;

use axum::http::StatusCode;

use super::test_utils::{
    body_bytes, body_json, build_router, get, header, is_valid_jpeg, jpeg_dimensions, tile_uri,
    MockImage, MockRenderingService,
};

fn backend() -> Arc<MockRenderingService> {
    Arc::new(
        MockRenderingService::new()
            .with_image("101", &[4096, 1024, 256])
            .with_image("202", &[])
            .with_mock_image(
                "empty",
                MockImage::Empty {
                    level_widths: vec![2048],
                },
            )
            .with_mock_image("broken", MockImage::Failing),
    )
}

// =============================================================================
// Basic Endpoints
// =============================================================================

#[tokio::test]
async fn test_index() {
    let router = build_router(backend());

    let response = get(&router, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    assert!(String::from_utf8_lossy(&body).contains("Welcome"));
}

#[tokio::test]
async fn test_health() {
    let router = build_router(backend());

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let router = build_router(backend());

    let response = get(&router, &tile_uri("render_tile", "101", 800.0, 800.0, 256, 1)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/jpeg");
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    assert_eq!(header(&response, "x-tile-cache-hit"), "false");
    assert_eq!(header(&response, "x-tile-session-reused"), "false");
    assert_eq!(header(&response, "x-tile-policy"), "pyramid");
    assert!(header(&response, "server-timing").contains("render;dur="));

    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body), "Response should be a valid JPEG");
}

#[tokio::test]
async fn test_native_pyramid_example_scenario() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(&router, &tile_uri("render_tile_catmaid", "101", 800.0, 800.0, 256, 1)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let regions = backend.rendered_regions().await;
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].level, Some(1));
    assert_eq!(regions[0].origin_x, 200.0);
    assert_eq!(regions[0].origin_y, 200.0);
    assert_eq!((regions[0].width, regions[0].height), (256, 256));
    assert_eq!(regions[0].compression, 0.8);
}

#[tokio::test]
async fn test_synthetic_zoom_example_scenario() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(&router, &tile_uri("render_tile", "202", 64.0, 32.0, 256, 2)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-policy"), "synthetic");

    let regions = backend.rendered_regions().await;
    assert_eq!(regions[0].level, None);
    assert_eq!((regions[0].origin_x, regions[0].origin_y), (64.0, 32.0));
    assert_eq!((regions[0].width, regions[0].height), (1024, 1024));

    let body = body_bytes(response).await;
    assert_eq!(jpeg_dimensions(&body), (256, 256));
}

#[tokio::test]
async fn test_synthetic_zoom_tile_size_at_every_zoom() {
    let router = build_router(backend());

    for (w, h) in [(256, 256), (300, 120), (1, 7)] {
        for zoom in 0..5 {
            let uri = format!(
                "/render_tile/202/?z=0&t=0&x=0&y=0&w={}&h={}&zm={}&quality=80",
                w, h, zoom
            );
            let response = get(&router, &uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(header(&response, "x-tile-policy"), "synthetic");

            let body = body_bytes(response).await;
            assert_eq!(jpeg_dimensions(&body), (w, h), "{}x{} at zoom {}", w, h, zoom);
        }
    }
}

#[tokio::test]
async fn test_trailing_slash_is_optional() {
    let router = build_router(backend());

    for route in ["render_tile", "render_tile_catmaid"] {
        let with_slash = format!("/{}/101/?z=0&t=0&x=0&y=0&w=128&h=128&zm=0&quality=70", route);
        let without = format!("/{}/101?z=0&t=0&x=0&y=0&w=128&h=128&zm=0&quality=70", route);

        assert_eq!(get(&router, &with_slash).await.status(), StatusCode::OK);
        assert_eq!(get(&router, &without).await.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_float_fields_are_accepted() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(
        &router,
        "/render_tile_catmaid/202/?z=0&t=0.0&x=10.5&y=0&w=100.9&h=50.2&zm=0&quality=79.6",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let regions = backend.rendered_regions().await;
    assert_eq!((regions[0].width, regions[0].height), (100, 50));
    assert_eq!(regions[0].origin_x, 10.5);
    assert_eq!(regions[0].compression, 0.8);

    let body = body_bytes(response).await;
    assert_eq!(jpeg_dimensions(&body), (100, 50));
}

#[tokio::test]
async fn test_out_of_range_quality_is_clamped() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(
        &router,
        "/render_tile_catmaid/101/?z=0&t=0&x=0&y=0&w=64&h=64&zm=0&quality=0",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(
        &router,
        "/render_tile_catmaid/101/?z=0&t=0&x=0&y=0&w=64&h=64&zm=0&quality=500",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let regions = backend.rendered_regions().await;
    assert_eq!(regions[0].compression, 0.01);
    assert_eq!(regions[1].compression, 1.0);
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_missing_field() {
    let router = build_router(backend());

    let response = get(
        &router,
        "/render_tile/101/?z=0&t=0&x=0&y=0&w=256&h=256&quality=80",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["status"], 400);
    assert!(json["message"].as_str().unwrap().contains("'zm'"));
}

#[tokio::test]
async fn test_non_numeric_field() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(
        &router,
        "/render_tile/101/?z=0&t=0&x=left&y=0&w=256&h=256&zm=0&quality=80",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("'x'"));
    assert_eq!(backend.prepare_count(), 0);
}

#[tokio::test]
async fn test_fractional_zoom_rejected() {
    let router = build_router(backend());

    let response = get(
        &router,
        "/render_tile/101/?z=0&t=0&x=0&y=0&w=256&h=256&zm=1.5&quality=80",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zoom_out_of_range() {
    let backend = backend();
    let router = build_router(Arc::clone(&backend));

    let response = get(&router, &tile_uri("render_tile", "101", 0.0, 0.0, 256, 3)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "zoom_out_of_range");
    assert_eq!(backend.render_count(), 0);
}

#[tokio::test]
async fn test_unknown_image() {
    let router = build_router(backend());

    let response = get(&router, &tile_uri("render_tile", "999", 0.0, 0.0, 256, 0)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert!(json["message"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_render_without_data() {
    let router = build_router(backend());

    let response = get(&router, &tile_uri("render_tile", "empty", 0.0, 0.0, 256, 0)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "no_tile_data");
}

#[tokio::test]
async fn test_backend_failure() {
    let router = build_router(backend());

    let response = get(
        &router,
        &tile_uri("render_tile_catmaid", "broken", 0.0, 0.0, 256, 0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "render_error");
    assert!(json["message"].as_str().unwrap().contains("renderer crashed"));
}

#[tokio::test]
async fn test_unknown_route() {
    let router = build_router(backend());

    let response = get(&router, "/tiles/101/0/0/0.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
