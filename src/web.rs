use crate::{
    app::{AppError, AppService, FileEntry, UploadOutcome},
    library::FileRecord,
    pipeline::CategoryAssignment,
};
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::{fmt::Debug, sync::Arc};
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<AppService>,
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
            Ok(mut stream) => {
                stream.recv().await;
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

fn router(app: Arc<AppService>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/api/files/upload", post(upload))
        .route("/api/files/list", post(list))
        .route("/api/files/delete", post(delete))
        .route("/api/files/retag", post(retag))
        .route("/api/files/categorize", post(categorize))
        .route("/api/files/search", post(search))
        .route("/api/files/:owner/:filename", get(download))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
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

async fn start_app(app: Arc<AppService>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {addr}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Run the HTTP API until Ctrl-C.
///
/// The service is dropped after the runtime, outside of any async context,
/// since the blocking AI client owns its own runtime.
pub fn start_daemon(app: AppService, addr: &str) -> anyhow::Result<()> {
    let app = Arc::new(app);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(start_app(app.clone(), addr));

    drop(runtime);
    drop(app);

    result
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self.0 {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidName(_) | AppError::Base64(_) => StatusCode::BAD_REQUEST,
            AppError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Tagging(_) => {
                log::warn!("{self:?}");
                StatusCode::BAD_GATEWAY
            }
            AppError::IO(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerRequest {
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FileRequest {
    pub owner_id: String,
    pub filename: String,
}

#[derive(Deserialize)]
pub struct UploadRequest {
    pub owner_id: String,
    pub filename: String,
    pub content_b64: String,
}

impl Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UploadRequest {{ owner_id: {:?}, filename: {:?}, content_b64: [REDACTED] }}",
            self.owner_id, self.filename
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub owner_id: String,
    pub query: String,
}

async fn upload(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<UploadOutcome>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let content = STANDARD.decode(payload.content_b64)?;
        let outcome = app.upload(&payload.owner_id, &payload.filename, &content)?;
        Ok(Json(outcome))
    })
}

async fn list(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<Vec<FileEntry>>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.list(&payload.owner_id)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn delete(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<FileRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.delete(&payload.owner_id, &payload.filename)?;
        Ok(Json(json!({"filename": payload.filename, "deleted": true})))
    })
}

async fn retag(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<FileRequest>,
) -> Result<Json<FileRecord>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.retag(&payload.owner_id, &payload.filename)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn categorize(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<CategoryAssignment>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.categorize(&payload.owner_id)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<FileRecord>>, HttpError> {
    log::debug!("payload: {payload:?}");
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.search(&payload.owner_id, &payload.query)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn download(
    State(state): State<Arc<SharedState>>,
    Path((owner_id, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpError> {
    let app = state.app.clone();

    let content = tokio::task::block_in_place(move || app.download(&owner_id, &filename))?;

    let mime_type = infer::get(&content)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, mime_type)], content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_status_codes() {
        let status = |err: AppError| HttpError(err).into_response().status();

        assert_eq!(status(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::InvalidName("..".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::AiUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(AppError::Other(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
