use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::StatusCode,
    routing, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use registry_common::store::PersonStore;

use super::students;
use crate::auth::AdminCredentials;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn PersonStore>,
    pub credentials: Arc<AdminCredentials>,
}

pub fn add_routes(
    router: Router,
    store: Arc<dyn PersonStore>,
    credentials: AdminCredentials,
    max_body_size: usize,
    concurrency_limit: usize,
) -> Router {
    let state = AppState {
        store,
        credentials: Arc::new(credentials),
    };

    let students = Router::new()
        .route(
            "/api/students",
            routing::post(students::create_student)
                .layer::<_, Infallible>(ConcurrencyLimitLayer::new(concurrency_limit))
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/api/students/:id", routing::get(students::get_student))
        .route("/students/:id", routing::get(students::student_page))
        .route("/_readiness", routing::get(readiness))
        .with_state(state);

    router
        .route("/", routing::get(index))
        .route("/_liveness", routing::get(index)) // No async loop, just check axum health
        .merge(students)
        .layer(TraceLayer::new_for_http())
}

pub async fn index() -> &'static str {
    "student registry"
}

async fn readiness(State(store): State<Arc<dyn PersonStore>>) -> (StatusCode, &'static str) {
    match store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            error!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
