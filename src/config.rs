//! Configuration management.
//!
//! Every option is a command-line flag that can also be set through an
//! environment variable with the `TILER_` prefix:
//!
//! - `TILER_HOST` - Server bind address (default: 0.0.0.0)
//! - `TILER_PORT` - Server port (default: 4080)
//! - `TILER_IMAGES_DIR` - Root directory of the local image store (required)
//! - `TILER_SERVER_ID` - Backend server identifier used in cache keys (default: 1)
//! - `TILER_CACHE_TILES` - Tile cache capacity in bytes (default: 100MB)
//! - `TILER_CACHE_ENTRIES` - Maximum cached entries (default: 10000)
//! - `TILER_ZOOM_DIRECTION` - `coarsest-first` or `finest-first`
//! - `TILER_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `TILER_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pyramid_tiler::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::pyramid::ZoomDirection;
use crate::tile::{DEFAULT_TILE_CACHE_CAPACITY, DEFAULT_TILE_CACHE_ENTRIES};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4080;

/// Default backend server identifier.
pub const DEFAULT_SERVER_ID: &str = "1";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pyramid Tiler - deep-zoom tile server for multi-resolution microscopy images.
///
/// Resolves tile requests to regions of a rendering backend, selecting a
/// native pyramid level when the image has one and zooming synthetically
/// otherwise.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TILER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TILER_PORT")]
    pub port: u16,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    /// Root directory holding one subdirectory of plane files per image.
    #[arg(long, env = "TILER_IMAGES_DIR")]
    pub images_dir: PathBuf,

    /// Identifier of the rendering backend, part of every cache key.
    #[arg(long, default_value = DEFAULT_SERVER_ID, env = "TILER_SERVER_ID")]
    pub server_id: String,

    /// Order in which client zoom levels walk the pyramid.
    ///
    /// `coarsest-first`: zoom 0 is the coarsest level.
    /// `finest-first`: zoom 0 is full resolution.
    #[arg(long, default_value = "coarsest-first", env = "TILER_ZOOM_DIRECTION")]
    pub zoom_direction: ZoomDirection,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Tile cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "TILER_CACHE_TILES")]
    pub cache_tiles: usize,

    /// Maximum number of cached entries.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_ENTRIES, env = "TILER_CACHE_ENTRIES")]
    pub cache_entries: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "TILER_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "TILER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.images_dir.as_os_str().is_empty() {
            return Err(
                "Images directory is required. Set --images-dir or TILER_IMAGES_DIR".to_string(),
            );
        }

        if self.server_id.trim().is_empty() {
            return Err("server_id must not be empty".to_string());
        }

        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }
        if self.cache_entries == 0 {
            return Err("cache_entries must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
