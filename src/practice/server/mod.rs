// SPDX-License-Identifier: MIT

//! HTTP surface for both pipelines

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::{PracticeError, Result};
use crate::practice::newsletter::{Newsletter, NewsletterPipeline, NewsletterRequest};
use crate::practice::stock::{StockPipeline, StockReport, StockRequest};
use crate::practice::workflow::graph::RunEvent;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Clone)]
pub struct AppState {
    pub newsletter: Arc<NewsletterPipeline>,
    pub stock: Arc<StockPipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/newsletter", post(create_newsletter))
        .route("/api/newsletter/stream", post(stream_newsletter))
        .route("/api/stock", post(create_stock_report))
        .route("/api/stock/stream", post(stream_stock_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Error body with a status derived from the underlying failure
#[derive(Debug)]
pub struct ApiError(PracticeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.root() {
            PracticeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PracticeError::NoContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PracticeError::Api { .. } | PracticeError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PracticeError> for ApiError {
    fn from(err: PracticeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self.0);
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_newsletter(
    State(state): State<AppState>,
    Json(request): Json<NewsletterRequest>,
) -> std::result::Result<Json<Newsletter>, ApiError> {
    Ok(Json(state.newsletter.run(request).await?))
}

async fn create_stock_report(
    State(state): State<AppState>,
    Json(request): Json<StockRequest>,
) -> std::result::Result<Json<StockReport>, ApiError> {
    Ok(Json(state.stock.run(request).await?))
}

async fn stream_newsletter(
    State(state): State<AppState>,
    Json(request): Json<NewsletterRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let pipeline = state.newsletter.clone();
    stream_run(move |tx| async move { pipeline.stream(request, tx).await })
}

async fn stream_stock_report(
    State(state): State<AppState>,
    Json(request): Json<StockRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let pipeline = state.stock.clone();
    stream_run(move |tx| async move { pipeline.stream(request, tx).await })
}

fn sse_event(name: &str, data: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Forward run events as `progress`, then finish with `result` or `error`
fn stream_run<F, Fut, T>(run: F) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>
where
    F: FnOnce(mpsc::Sender<RunEvent>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let (sse_tx, sse_rx) = mpsc::channel::<Event>(100);

    tokio::spawn(async move {
        let (run_tx, mut run_rx) = mpsc::channel::<RunEvent>(100);

        let forward = async {
            while let Some(event) = run_rx.recv().await {
                let _ = sse_tx.send(sse_event("progress", &event)).await;
            }
        };
        let (outcome, ()) = tokio::join!(run(run_tx), forward);

        let last = match outcome {
            Ok(result) => sse_event("result", &result),
            Err(e) => {
                log::error!("Streaming run failed: {}", e);
                sse_event("error", &json!({ "error": e.to_string() }))
            }
        };
        let _ = sse_tx.send(last).await;
    });

    let stream = ReceiverStream::new(sse_rx).map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::WorkflowError;

    #[test]
    fn test_api_error_status_looks_through_step_failures() {
        let no_content = ApiError::from(PracticeError::Workflow(WorkflowError::StepFailed {
            step: "search_sub_theme_articles".to_string(),
            source: Box::new(PracticeError::NoContent("nothing".to_string())),
        }));
        assert_eq!(no_content.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad_input = ApiError::from(PracticeError::InvalidInput("empty".to_string()));
        assert_eq!(bad_input.status(), StatusCode::BAD_REQUEST);

        let stalled = ApiError::from(PracticeError::Workflow(WorkflowError::Stalled(vec![])));
        assert_eq!(stalled.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_index_page_posts_to_api() {
        assert!(INDEX_HTML.contains("/api/newsletter/stream"));
        assert!(INDEX_HTML.contains("/api/stock/stream"));
    }
}
