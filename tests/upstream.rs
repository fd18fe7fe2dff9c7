use std::collections::HashMap;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use news_summariser::AppState;
use news_summariser::api::routes::create_router;
use news_summariser::config::Config;
use news_summariser::error::AppError;
use news_summariser::llm::{GeminiClient, Summarizer};
use news_summariser::news::{Category, NewsApiClient, NewsSource};

/// Serves `router` on an ephemeral local port and returns its base url.
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config_for(base: &str, extra: &[(&str, &str)]) -> Config {
    let base = base.to_string();
    let extra: HashMap<String, String> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(move |key| match key {
        "NEWS_API_KEY" => Some("news-key".into()),
        "GEMINI_API_KEY" => Some("gemini-key".into()),
        "NEWS_API_URL" => Some(format!("{}/v2/top-headlines", base)),
        "GEMINI_API_URL" => Some(base.clone()),
        other => extra.get(other).cloned(),
    })
    .unwrap()
}

fn headlines_body() -> Value {
    json!({
        "status": "ok",
        "totalResults": 3,
        "articles": [
            {
                "source": { "id": null, "name": "Example Wire" },
                "title": "Chip makers rally",
                "url": "https://news.example/chips",
                "description": "Shares climbed."
            },
            {
                "source": { "id": null, "name": "Nobody" },
                "title": null,
                "url": "https://news.example/untitled",
                "description": null
            },
            {
                "source": { "id": null, "name": null },
                "title": "Rust 2024 ships",
                "url": "https://news.example/rust",
                "description": null
            }
        ]
    })
}

async fn headlines(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorized = headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some("news-key");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "error", "code": "apiKeyMissing", "message": "No key" })),
        );
    }
    if query.get("category").map(String::as_str) != Some("science")
        || query.get("language").map(String::as_str) != Some("en")
        || query.get("pageSize").map(String::as_str) != Some("5")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "code": "parametersMissing", "message": "bad query" })),
        );
    }
    (StatusCode::OK, Json(headlines_body()))
}

#[tokio::test]
async fn news_client_maps_headlines_and_drops_untitled_entries() {
    let base = serve(Router::new().route("/v2/top-headlines", get(headlines))).await;
    let client = NewsApiClient::new(&config_for(&base, &[])).unwrap();

    let articles = client.top_headlines(Category::Science).await.unwrap();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, ["Chip makers rally", "Rust 2024 ships"]);
    assert_eq!(articles[0].source_name.as_deref(), Some("Example Wire"));
    assert_eq!(articles[1].source_name, None);
    assert_eq!(articles[1].description, None);
}

#[tokio::test]
async fn news_server_error_is_unavailable() {
    let base = serve(Router::new().route(
        "/v2/top-headlines",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;
    let client = NewsApiClient::new(&config_for(&base, &[])).unwrap();

    let err = client.top_headlines(Category::Technology).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamUnavailable(ref msg) if msg.contains("500")));
}

#[tokio::test]
async fn news_error_status_in_body_is_unavailable() {
    let base = serve(Router::new().route(
        "/v2/top-headlines",
        get(|| async {
            Json(json!({
                "status": "error",
                "code": "rateLimited",
                "message": "Too many requests"
            }))
        }),
    ))
    .await;
    let client = NewsApiClient::new(&config_for(&base, &[])).unwrap();

    let err = client.top_headlines(Category::Business).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamUnavailable(ref msg) if msg.contains("rateLimited")));
}

#[tokio::test]
async fn null_article_list_is_an_empty_result() {
    let base = serve(Router::new().route(
        "/v2/top-headlines",
        get(|| async { Json(json!({ "status": "ok", "totalResults": 0, "articles": null })) }),
    ))
    .await;
    let client = NewsApiClient::new(&config_for(&base, &[])).unwrap();

    let articles = client.top_headlines(Category::Science).await.unwrap();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn news_body_that_is_not_json_is_malformed() {
    let base = serve(Router::new().route(
        "/v2/top-headlines",
        get(|| async { "<html>maintenance</html>" }),
    ))
    .await;
    let client = NewsApiClient::new(&config_for(&base, &[])).unwrap();

    let err = client.top_headlines(Category::General).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamMalformed(_)));
}

#[tokio::test]
async fn slow_news_service_times_out_as_unavailable() {
    let base = serve(Router::new().route(
        "/v2/top-headlines",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "status": "ok", "articles": [] }))
        }),
    ))
    .await;
    let client =
        NewsApiClient::new(&config_for(&base, &[("UPSTREAM_TIMEOUT_SECS", "1")])).unwrap();

    let err = client.top_headlines(Category::Health).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamUnavailable(_)));
}

async fn generate(
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if action != "gemini-2.0-flash-lite:generateContent"
        || headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("gemini-key")
    {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": { "message": "not found" } })));
    }
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    if !prompt.contains("The quick brown fox jumps over the lazy dog.") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": { "message": "bad prompt" } })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "A fox jumps over a dog.\n" }] }
            }]
        })),
    )
}

#[tokio::test]
async fn gemini_client_returns_generated_text() {
    let base = serve(Router::new().route("/models/:action", post(generate))).await;
    let client = GeminiClient::new(&config_for(&base, &[])).unwrap();

    let summary = client
        .summarize("The quick brown fox jumps over the lazy dog.")
        .await
        .unwrap();
    assert_eq!(summary, "A fox jumps over a dog.");
}

#[tokio::test]
async fn gemini_reply_without_text_is_malformed() {
    let base = serve(Router::new().route(
        "/models/:action",
        post(|| async { Json(json!({ "candidates": [{ "content": { "parts": [] } }] })) }),
    ))
    .await;
    let client = GeminiClient::new(&config_for(&base, &[])).unwrap();

    let err = client.summarize("Some article.").await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamMalformed(_)));
}

#[tokio::test]
async fn gemini_rate_limit_is_unavailable() {
    let base = serve(Router::new().route(
        "/models/:action",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "code": 429, "message": "Resource has been exhausted" } })),
            )
        }),
    ))
    .await;
    let client = GeminiClient::new(&config_for(&base, &[])).unwrap();

    let err = client.summarize("Some article.").await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamUnavailable(ref msg) if msg.contains("exhausted")));
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Router wired with the live clients, both pointed at a local stub.
async fn live_app(stub: Router) -> Router {
    let base = serve(stub).await;
    create_router(AppState::new(config_for(&base, &[])).unwrap())
}

#[tokio::test]
async fn fetch_news_reports_news_server_error_without_articles() {
    let app = live_app(Router::new().route(
        "/v2/top-headlines",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;

    let request = Request::builder()
        .uri("/fetch_news?category=technology")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.is_array());
    assert_eq!(body["error"]["kind"], "upstream_unavailable");
}

#[tokio::test]
async fn fetch_news_serves_mapped_headlines_end_to_end() {
    let app = live_app(Router::new().route("/v2/top-headlines", get(headlines))).await;

    let request = Request::builder()
        .uri("/fetch_news?category=science")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["source_name"], "Example Wire");
}

#[tokio::test]
async fn summarize_reports_reply_without_text_as_malformed() {
    let app = live_app(Router::new().route(
        "/models/:action",
        post(|| async { Json(json!({ "candidates": [{ "content": { "parts": [{}] } }] })) }),
    ))
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/summarize_article")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"content":"Some article."}"#))
        .unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "upstream_malformed");
}

#[tokio::test]
async fn summarize_returns_gemini_text_end_to_end() {
    let app = live_app(Router::new().route("/models/:action", post(generate))).await;

    let request = Request::builder()
        .method("POST")
        .uri("/summarize_article")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"content":"The quick brown fox jumps over the lazy dog."}"#,
        ))
        .unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "summary": "A fox jumps over a dog." }));
}
