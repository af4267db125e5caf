//! HTTP server layer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /render_tile/{id}/   GET /render_tile_catmaid/{id}/       │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (query parsing, errors)  │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    error_status, health_handler, index_handler, render_tile_catmaid_handler,
    render_tile_handler, AppState, ErrorResponse, HealthResponse, CACHE_HIT_HEADER,
    POLICY_HEADER, SERVER_TIMING_HEADER, SESSION_REUSED_HEADER,
};
pub use routes::{create_router, RouterConfig};
