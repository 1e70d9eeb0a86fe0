//! HTTP daemon wiring for the devlog activity reporter.
//!
//! The server is a thin adapter: normalization, classification, and
//! rendering live in `devlog-core`; persistence lives in `devlog-db`.
//! The store connection is serialized behind a tokio mutex.

pub mod config;
pub mod projects;
pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use devlog_db::{DayBoundary, EventStore};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub use config::Config;

/// Shared per-request state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<EventStore>>,
    pub projects_path: Arc<PathBuf>,
    pub day_boundary: DayBoundary,
}

impl AppState {
    #[must_use]
    pub fn new(store: EventStore, projects_path: PathBuf, day_boundary: DayBoundary) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            projects_path: Arc::new(projects_path),
            day_boundary,
        }
    }
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await
}
