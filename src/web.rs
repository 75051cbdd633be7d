use crate::semantic::{Recommendation, SearchError, SearchHit, SearchService, ServiceStatus, UserProfile};
use crate::knowledge::KnowledgeEntry;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

/// Request bodies are a query or a profile; anything larger is rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct SharedState {
    service: Arc<SearchService>,
}

pub fn router(service: Arc<SearchService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/search", post(search))
        .route("/api/recommend", post(recommend))
        .route("/api/status", get(status))
        .route("/api/entries/:id", get(entry))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

/// Serve until Ctrl+C or SIGTERM. Must run inside a tokio runtime.
pub async fn serve(service: Arc<SearchService>, listen: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::warn!("shutting down");
}

#[derive(Debug)]
struct HttpError(SearchError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        // details stay in the log
        log::error!("{:?}", self.0);
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "search failed"})),
        )
            .into_response()
    }
}

impl From<SearchError> for HttpError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, HttpError> {
    let hits = state.service.search(&payload.query).await?;
    Ok(Json(hits))
}

async fn recommend(
    State(state): State<Arc<SharedState>>,
    Json(profile): Json<UserProfile>,
) -> Json<Vec<Recommendation>> {
    Json(state.service.recommend(&profile))
}

async fn entry(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<usize>,
) -> Result<Json<KnowledgeEntry>, (axum::http::StatusCode, Json<serde_json::Value>)> {
    state.service.entry(id).cloned().map(Json).ok_or((
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({"error": "not found"})),
    ))
}

async fn status(State(state): State<Arc<SharedState>>) -> Json<ServiceStatus> {
    Json(state.service.status())
}
