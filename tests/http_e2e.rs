//! HTTP end-to-end tests.
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`:
//! - Bearer authentication on every `/news` and `/history` route
//! - Status codes and bodies for saves, fetches and recommendations
//! - Error bodies carrying stable codes
//! - The upstream client against a local stand-in provider

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]
#![cfg(feature = "http")]

mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use common::{ScriptedProvider, presentable_source, services};
use jsonwebtoken::{EncodingKey, Header, encode};
use newsroom::current_timestamp;
use newsroom::http::{Claims, JwtAuthenticator, JwtConfig, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "k9-Lz2qW7vX4mN8pR3tY6uB1cD5fG0hJ";

// ============================================================================
// Test Helpers
// ============================================================================

fn token_for(sub: &str) -> String {
    let now = current_timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        exp: now + 3600,
        iat: now,
        iss: None,
        aud: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

fn app(provider: Arc<ScriptedProvider>) -> axum::Router {
    router(
        services(provider),
        JwtAuthenticator::new(&JwtConfig::new(SECRET)),
    )
}

fn default_app() -> axum::Router {
    app(Arc::new(
        ScriptedProvider::paged(10, 20).with_sources(vec![presentable_source("bbc")]),
    ))
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let response = default_app().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = default_app()
        .oneshot(get("/news/lang/en", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: "u1".to_string(),
            exp: current_timestamp() + 3600,
            iat: 0,
            iss: None,
            aud: None,
        },
        &EncodingKey::from_secret(b"some-other-secret-of-sufficient-length"),
    )
    .unwrap();
    let request = Request::builder()
        .uri("/history/fetch-history")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::empty())
        .unwrap();

    let response = default_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// News routes
// ============================================================================

#[tokio::test]
async fn test_latest_by_language_route() {
    let response = default_app()
        .oneshot(get("/news/lang/en", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["totalResults"], 80);
    assert_eq!(body["results"].as_array().unwrap().len(), 80);
    assert_eq!(body["nextPage"], "p9");
}

#[tokio::test]
async fn test_domain_route_with_and_without_page() {
    let provider = Arc::new(ScriptedProvider::paged(10, 20));
    let app = app(Arc::clone(&provider));

    let response = app
        .clone()
        .oneshot(get("/news/bbc", Some("u1")))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["totalResults"], 50);
    assert_eq!(provider.calls(), 5);

    let response = app
        .oneshot(get("/news/next-page/bbc?page=p6", Some("u1")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["totalResults"], 10);
    assert_eq!(body["nextPage"], "p7");
    assert_eq!(provider.calls(), 6);
}

#[tokio::test]
async fn test_search_requires_term() {
    let response = default_app()
        .oneshot(get("/news/search?language=en", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_search_forwards_query_parameters() {
    let provider = Arc::new(ScriptedProvider::paged(10, 20));
    let response = app(Arc::clone(&provider))
        .oneshot(get(
            "/news/search?searchWord=election&language=hi&category=politics",
            Some("u1"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["totalResults"], 20);

    let first = &provider.queries()[0];
    assert_eq!(first.title_query.as_deref(), Some("election"));
    assert_eq!(first.language.as_deref(), Some("hi"));
    assert_eq!(first.category.as_deref(), Some("politics"));
}

#[tokio::test]
async fn test_sources_route_returns_list() {
    let response = default_app()
        .oneshot(get("/news/sources/en", Some("u1")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "bbc");
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let provider = Arc::new(ScriptedProvider::paged(10, 20).failing_on_call(1));
    let response = app(provider)
        .oneshot(get("/news/lang/en", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["code"], "upstream_unavailable");
}

// ============================================================================
// History routes
// ============================================================================

#[tokio::test]
async fn test_save_then_fetch_history() {
    let app = default_app();
    let body = json!({ "articles": [{ "article_id": "a1", "title": "Hello" }] });

    let response = app
        .clone()
        .oneshot(post_json("/history/save-news", "u1", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["status"], "created");
    assert_eq!(created["data"]["user_id"], "u1");

    let response = app
        .clone()
        .oneshot(post_json("/history/save-news", "u1", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["status"], "updated");
    assert_eq!(updated["data"]["articles"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get("/history/fetch-history", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["data"]["articles"][0]["title"], "Hello");
}

#[tokio::test]
async fn test_history_is_scoped_to_token_subject() {
    let app = default_app();
    let body = json!({ "sources": [{ "id": "bbc" }] });
    app.clone()
        .oneshot(post_json("/history/save-news", "alice", &body))
        .await
        .unwrap();

    let response = app
        .oneshot(get("/history/fetch-history", Some("bob")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");
}

#[tokio::test]
async fn test_empty_save_is_bad_request() {
    let response = default_app()
        .oneshot(post_json("/history/save-news", "u1", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_save_body_is_invalid_input() {
    let body = json!({ "articles": "not-a-list" });
    let response = default_app()
        .oneshot(post_json("/history/save-news", "u1", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_input");
    assert!(body["message"].as_str().unwrap().contains("articles"));
}

#[tokio::test]
async fn test_non_json_save_body_is_invalid_input() {
    let request = Request::builder()
        .method("POST")
        .uri("/history/save-news")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u1")))
        .body(Body::from("articles=a1"))
        .unwrap();
    let response = default_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_repeated_query_parameter_is_invalid_input() {
    let response = default_app()
        .oneshot(get("/news/bbc?page=p2&page=p3", Some("u1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_recommendations_route() {
    let response = default_app()
        .oneshot(get("/history/recommendations", Some("u1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Recommendations fetched successfully");
    assert_eq!(body["recommendedArticles"].as_array().unwrap().len(), 10);
    assert_eq!(body["recommendedSources"], body["suggestedPublishers"]);
    assert_eq!(body["mode"], "cold_start");
}

// ============================================================================
// Upstream client
// ============================================================================

mod newsdata_client {
    use axum::Json;
    use axum::extract::Query;
    use axum::routing::get;
    use newsroom::config::UpstreamConfig;
    use newsroom::upstream::{LatestQuery, NewsDataClient, NewsProvider, SourcesQuery};
    use newsroom::Error;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn latest(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        if params.get("apikey").map(String::as_str) != Some("test-key") {
            return Json(json!({ "status": "error", "results": { "message": "bad key" } }));
        }
        let page = params.get("page").cloned();
        let next = if page.is_none() { json!(1_712_345) } else { Value::Null };
        Json(json!({
            "status": "success",
            "totalResults": 2,
            "results": [
                { "article_id": "a1", "keywords": null, "category": ["top"] },
                { "article_id": "a2", "ai_tag": "only in paid plans" }
            ],
            "nextPage": next
        }))
    }

    async fn sources() -> Json<Value> {
        Json(json!({
            "status": "success",
            "results": [{ "id": "bbc", "url": "https://bbc.com", "description": "BBC" }]
        }))
    }

    async fn spawn_provider() -> String {
        let app = axum::Router::new()
            .route("/latest", get(latest))
            .route("/sources", get(sources));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String, key: &str) -> NewsDataClient {
        let config = UpstreamConfig {
            base_url,
            api_key: Some(SecretString::from(key.to_string())),
            ..UpstreamConfig::default()
        };
        NewsDataClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_latest_decodes_page_and_numeric_token() {
        let base = spawn_provider().await;
        let page = client(base, "test-key")
            .latest(&LatestQuery::language("en"))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 2);
        assert!(page.results[0].keywords.is_empty());
        assert_eq!(page.results[1].extra["ai_tag"], "only in paid plans");
        assert_eq!(page.next_page.as_deref(), Some("1712345"));
    }

    #[tokio::test]
    async fn test_error_payload_is_upstream_unavailable() {
        let base = spawn_provider().await;
        let err = client(base, "wrong-key")
            .latest(&LatestQuery::language("en"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_sources_decode() {
        let base = spawn_provider().await;
        let sources = client(base, "test-key")
            .sources(&SourcesQuery::language("en"))
            .await
            .unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].is_presentable());
    }
}
