//! HTTP boundary: `POST /ask` plus the web UI and extracted image files.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::answer::AnswerGenerator;
use crate::document::Answer;
use crate::error::ServiceError;
use crate::retriever::Retriever;

/// Message returned with `400` when the question is absent or blank.
pub const QUERY_REQUIRED: &str = "Query is required";

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Everything a request needs; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    retriever: Retriever,
    generator: AnswerGenerator,
    top_k: usize,
    image_dir: Arc<PathBuf>,
}

impl AppState {
    /// Bundles the retriever and generator with the per-request settings.
    pub fn new(
        retriever: Retriever,
        generator: AnswerGenerator,
        top_k: usize,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            retriever,
            generator,
            top_k: top_k.max(1),
            image_dir: Arc::new(image_dir.into()),
        }
    }

    /// Retrieves context for `query`, then generates the answer. Blocking.
    pub fn answer_question(&self, query: &str) -> Result<Answer, ServiceError> {
        let found = self.retriever.find_relevant_content(query, self.top_k)?;
        let response = self.generator.generate_response(
            query,
            &found.relevant_chunks,
            &found.relevant_images,
        )?;
        Ok(Answer {
            response,
            images: found.relevant_images,
        })
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/healthz", get(healthz))
        .route("/ask", post(ask_handler))
        .route("/images/:name", get(image_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    query: Option<String>,
}

/// JSON error payload.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>, (StatusCode, Json<ErrorBody>)> {
    let query = match payload {
        Ok(Json(request)) => request.query,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "rejected /ask body");
            None
        }
    };
    let Some(query) = query.filter(|query| !query.trim().is_empty()) else {
        return Err(error_response(StatusCode::BAD_REQUEST, QUERY_REQUIRED));
    };

    info!(query = %query, "answering question");
    let answer = tokio::task::spawn_blocking(move || state.answer_question(&query))
        .await
        .map_err(|err| {
            error!(error = %err, "answer task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "answer task failed")
        })?
        .map_err(|err| {
            error!(error = %err, "failed to answer question");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })?;
    Ok(Json(answer))
}

async fn image_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return error_response(StatusCode::BAD_REQUEST, "invalid image name").into_response();
    }
    let path = state.image_dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "image not found").into_response()
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to read image");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read image")
                .into_response()
        }
    }
}

fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}
