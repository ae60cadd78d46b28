//! HTTP surface over the job service.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::service::JobService;

pub mod error;
pub mod handlers;

pub use error::{AppError, ErrorBody};

#[derive(Clone)]
pub struct AppState {
    pub service: JobService,
    pub hostname: String,
}

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let blob_dir = state
        .service
        .launcher()
        .pipeline()
        .cache()
        .blob_dir()
        .to_path_buf();

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/job/{id}", get(handlers::job_status))
        .route("/download/{id}", get(handlers::download))
        .nest_service("/ai-cache", ServeDir::new(blob_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until `shutdown` resolves. In-flight requests are drained; jobs
/// are waited for by the caller.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Expands `:port` to `0.0.0.0:port`.
pub fn listen_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}
