use crate::metrics::MetricsExporter;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use typeahead_indexer::{ConsolidationWorker, IndexerError, QueryOutcome, TypeaheadService};

#[derive(Clone)]
pub struct AppState {
    pub service: TypeaheadService,
    pub worker: ConsolidationWorker,
    pub metrics: MetricsExporter,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query/:word", get(report_query))
        .route("/suggest/:prefix", get(suggest))
        .route("/index/:prefix", get(index_suggestions))
        .route("/consolidate", post(consolidate))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        let (status, code) = match &err {
            IndexerError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            IndexerError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "invalid_config"),
            IndexerError::RankedStoreError(_) => (StatusCode::BAD_GATEWAY, "store_error"),
            IndexerError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(json!({ "error": { "code": self.code, "message": self.message } })),
        )
            .into_response();
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from_static("1"));
        }
        response
    }
}

async fn report_query(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let word = word.trim();
    let outcome = match state.service.report_query(word).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if err.is_transient() {
                state.metrics.record_query(false);
            }
            return Err(err.into());
        }
    };

    let body = match outcome {
        QueryOutcome::Recorded { newly_indexed } => {
            state.metrics.record_query(true);
            json!({ "word": word, "recorded": true, "newly_indexed": newly_indexed })
        }
        QueryOutcome::Ignored => json!({ "word": word, "recorded": false }),
    };
    Ok(Json(body))
}

async fn suggest(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let prefix = prefix.trim();
    let suggestions = state.service.lookup_scored(prefix).await?;
    Ok(Json(json!({ "prefix": prefix, "suggestions": suggestions })))
}

async fn index_suggestions(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let prefix = prefix.trim();
    let words = state.service.index_suggestions(prefix).await?;
    Ok(Json(json!({ "prefix": prefix, "words": words })))
}

async fn consolidate(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.worker.trigger("http", true).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "triggered": true }))))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "consolidating": state.service.is_consolidating(),
        "index": state.service.index_snapshot(),
        "worker": state.worker.health_snapshot(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let index = state.service.index_snapshot();
    state.metrics.update(
        &state.worker.health_snapshot(),
        &index,
        state.service.is_consolidating(),
    );
    let (content_type, body) = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
