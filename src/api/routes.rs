use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Html,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::api::models::{Article, FetchNewsParams, SummarizeRequest, SummaryResponse};
use crate::error::{AppError, Result};
use crate::news::Category;

pub const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/fetch_news", get(fetch_news_handler))
        .route("/summarize_article", post(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn fetch_news_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<FetchNewsParams>, QueryRejection>,
) -> Result<Json<Vec<Article>>> {
    let Query(params) = params?;
    let category = Category::from_query(params.category.as_deref())?;
    tracing::info!(%category, "fetching headlines");

    let started = Instant::now();
    let articles =
        with_timeout(state.config.request_timeout, state.news.top_headlines(category)).await?;
    tracing::info!(
        %category,
        count = articles.len(),
        elapsed = ?started.elapsed(),
        "headlines fetched"
    );

    Ok(Json(articles))
}

async fn summarize_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    let Json(req) = payload?;
    let content = req.validated_content()?;
    tracing::info!(content_chars = content.chars().count(), "summarizing article");

    let started = Instant::now();
    let summary =
        with_timeout(state.config.request_timeout, state.summarizer.summarize(content)).await?;
    tracing::info!(elapsed = ?started.elapsed(), "summary generated");

    Ok(Json(SummaryResponse { summary }))
}

/// Bounds a whole upstream round trip; expiry is reported as the upstream
/// being unavailable.
async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::UpstreamUnavailable(format!(
            "request processing timed out after {:?}",
            limit
        ))),
    }
}
