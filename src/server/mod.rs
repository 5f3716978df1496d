//! HTTP trigger listener.
//!
//! The listener schedules sync jobs and replies immediately; it never waits
//! on dispatched work.
//!
//! # Endpoints
//!
//! - `GET` (any path) - Returns a plain-text count of configured projects
//! - `POST /` - Schedules a sync for every registered project (202)
//! - `POST /{org}/{name}` - Schedules a sync for one project (202, or 404
//!   when the key is not registered)
//! - any other method - 405

use std::sync::Arc;

pub mod trigger;

pub use trigger::{fallback_handler, status_handler, sync_all_handler, sync_one_handler};

use crate::dispatch::Dispatcher;
use crate::registry::Registry;

/// Shared application state, passed to all handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The read-only project registry.
    registry: Arc<Registry>,

    /// The job dispatcher triggers submit to.
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, dispatcher: Dispatcher) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                registry,
                dispatcher,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}

/// Builds the axum Router with the trigger surface.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(status_handler).post(sync_all_handler))
        .route("/{org}/{name}", get(status_handler).post(sync_one_handler))
        .fallback(fallback_handler)
        .with_state(app_state)
}
