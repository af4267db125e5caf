//! Rendering session reuse.
//!
//! Preparing a rendering session is the fixed cost of every tile. When a
//! viewer pans, dozens of tiles of the same image arrive back to back, so the
//! resolver first looks for an open session already bound to the image.
//!
//! Sessions bound to other images are released during the scan. A concurrent
//! request for another image may lose its session this way; its render fails with
//! [`RenderError::SessionClosed`](crate::error::RenderError::SessionClosed) and
//! the orchestrator falls back to a fresh session.
//!
//! The decision is split in two steps: [`SessionResolver::plan`] is pure over a
//! snapshot, [`SessionResolver::resolve`] applies it and performs the closes.

use tracing::debug;

use super::backend::RenderSession;

/// What to do with a snapshot of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionPlan {
    /// Index of the session to reuse, if one is bound to the image
    pub reuse: Option<usize>,

    /// Indices of sessions bound to other images
    pub release: Vec<usize>,
}

/// Outcome of resolving a session for an image.
#[derive(Debug)]
pub struct SessionResolution<S> {
    /// The reused session, or `None` if a fresh one must be prepared
    pub session: Option<S>,

    /// Number of unrelated sessions that were closed
    pub released: usize,
}

impl<S> SessionResolution<S> {
    /// Whether an existing session is being reused.
    pub fn reused(&self) -> bool {
        self.session.is_some()
    }
}

/// Finds reusable sessions and reclaims unrelated ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionResolver;

impl SessionResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Decide which session to reuse and which to release.
    ///
    /// The first session bound to `image_id` is reused. Every session bound to
    /// a different image is released. Further sessions bound to `image_id` are
    /// left alone.
    pub fn plan<S: RenderSession>(&self, image_id: &str, sessions: &[S]) -> ResolutionPlan {
        let mut plan = ResolutionPlan::default();

        for (index, session) in sessions.iter().enumerate() {
            if session.bound_image_id() == image_id {
                if plan.reuse.is_none() {
                    plan.reuse = Some(index);
                }
            } else {
                plan.release.push(index);
            }
        }

        plan
    }

    /// Resolve a session for `image_id` from a snapshot of open sessions.
    ///
    /// Closes every session bound to another image. The returned session is
    /// never closed.
    pub async fn resolve<S: RenderSession>(
        &self,
        image_id: &str,
        sessions: Vec<S>,
    ) -> SessionResolution<S> {
        let plan = self.plan(image_id, &sessions);
        let released = plan.release.len();

        let mut reused = None;
        for (index, session) in sessions.into_iter().enumerate() {
            if plan.reuse == Some(index) {
                reused = Some(session);
            } else if plan.release.binary_search(&index).is_ok() {
                debug!(
                    image_id = session.bound_image_id(),
                    "Releasing rendering session of unrelated image"
                );
                session.close().await;
            }
        }

        SessionResolution {
            session: reused,
            released,
        }
    }
}
