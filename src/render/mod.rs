//! Rendering backend abstraction.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └───────────┬─────────────────┬───────────┘
//!             │                 │
//!             ▼                 ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │ SessionResolver  │  │ RenderingService │
//! │ (reuse / release)│  │      trait       │
//! └────────┬─────────┘  └────────┬─────────┘
//!          │  SessionDirectory   │
//!          └──────────┬──────────┘
//!                     ▼
//!        ┌────────────────────────┐
//!        │ LocalRenderingService  │
//!        │ (directory of planes)  │
//!        └────────────────────────┘
//! ```

mod backend;
mod local;
mod session;

pub use backend::{RegionRequest, RenderSession, RenderingService, SessionDirectory};
pub use local::{LocalRenderingService, LocalSession, PLANE_EXTENSIONS};
pub use session::{ResolutionPlan, SessionResolution, SessionResolver};
