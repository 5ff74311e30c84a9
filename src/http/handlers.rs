//! Route handlers.

use super::AppState;
use super::auth::JwtAuthenticator;
use crate::models::{
    Article, MergeStatus, Recommendations, ResultSet, SaveRequest, Source, UserHistory, UserId,
};
use crate::services::SearchFilters;
use crate::{Error, Result};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRef, FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

/// Extractor output before its rejection is turned into an [`Error`].
type Extracted<T, R> = std::result::Result<T, R>;

/// User named by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    JwtAuthenticator: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| Error::Unauthorized("missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| Error::Unauthorized("invalid Authorization header encoding".to_string()))?;

        let authenticator = JwtAuthenticator::from_ref(state);
        match authenticator.authenticate(header) {
            Ok(user) => Ok(Self(user)),
            Err(e) => {
                metrics::counter!("newsroom_auth_failures_total").increment(1);
                Err(e)
            },
        }
    }
}

/// `?page=` on domain routes.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Provider page token.
    pub page: Option<String>,
}

/// Query of `/news/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Term matched against titles.
    pub search_word: Option<String>,
    /// Language filter.
    pub language: Option<String>,
    /// Category filter.
    pub category: Option<String>,
}

/// Query of `/news/next-search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextSearchParams {
    /// Term matched against titles.
    pub search_word: Option<String>,
    /// Provider page token.
    pub page: Option<String>,
}

/// Envelope of history responses.
#[derive(Debug, Serialize)]
pub struct HistoryEnvelope {
    /// Human-readable outcome.
    pub message: &'static str,
    /// `created`, `updated` or `found`.
    pub status: &'static str,
    /// The full history.
    pub data: UserHistory,
}

/// Body of `/history/recommendations`.
#[derive(Debug, Serialize)]
pub struct RecommendationsEnvelope {
    /// Human-readable outcome.
    pub message: &'static str,
    /// Sources and articles.
    #[serde(flatten)]
    pub recommendations: Recommendations,
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /news/lang/{language}`
pub async fn latest_by_language(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    language: Extracted<Path<String>, PathRejection>,
) -> Result<Json<ResultSet<Article>>> {
    let Path(language) = language?;
    state
        .services
        .aggregation()
        .latest_by_language(&language)
        .await
        .map(Json)
}

/// `GET /news/sources/{language}`
pub async fn sources(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    language: Extracted<Path<String>, PathRejection>,
) -> Result<Json<Vec<Source>>> {
    let Path(language) = language?;
    state.services.aggregation().sources(&language).await.map(Json)
}

/// `GET /news/search?searchWord=&language=&category=`
pub async fn search(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    params: Extracted<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ResultSet<Article>>> {
    let Query(params) = params?;
    let term = params.search_word.unwrap_or_default();
    let filters = SearchFilters {
        language: params.language,
        category: params.category,
    };
    state
        .services
        .aggregation()
        .search(&term, filters)
        .await
        .map(Json)
}

/// `GET /news/next-search?searchWord=&page=`
pub async fn next_search(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    params: Extracted<Query<NextSearchParams>, QueryRejection>,
) -> Result<Json<ResultSet<Article>>> {
    let Query(params) = params?;
    let term = params.search_word.unwrap_or_default();
    let page = params.page.unwrap_or_default();
    state
        .services
        .aggregation()
        .search_page(&term, &page)
        .await
        .map(Json)
}

/// `GET /news/{domain}?page=`
///
/// Without a page token this is the cached threshold fetch for the domain.
pub async fn domain(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    domain: Extracted<Path<String>, PathRejection>,
    params: Extracted<Query<PageParams>, QueryRejection>,
) -> Result<Json<ResultSet<Article>>> {
    let (Path(domain), Query(params)) = (domain?, params?);
    let aggregation = state.services.aggregation();
    let results = match params.page.filter(|p| !p.trim().is_empty()) {
        Some(page) => aggregation.domain_page(&domain, &page).await?,
        None => aggregation.latest_by_domain(&domain).await?,
    };
    Ok(Json(results))
}

/// `GET /news/next-page/{domain}?page=`
pub async fn next_domain_page(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    domain: Extracted<Path<String>, PathRejection>,
    params: Extracted<Query<PageParams>, QueryRejection>,
) -> Result<Json<ResultSet<Article>>> {
    let (Path(domain), Query(params)) = (domain?, params?);
    let page = params.page.unwrap_or_default();
    state
        .services
        .aggregation()
        .domain_page(&domain, &page)
        .await
        .map(Json)
}

/// `POST /history/save-news`
pub async fn save_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    request: Extracted<Json<SaveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<HistoryEnvelope>)> {
    let Json(request) = request?;
    let result = state.services.history().save_news(&user, request).await?;
    let (code, message) = match result.status {
        MergeStatus::Created => (StatusCode::CREATED, "News history created!"),
        MergeStatus::Updated => (StatusCode::OK, "News history updated!"),
    };
    Ok((
        code,
        Json(HistoryEnvelope {
            message,
            status: result.status.as_str(),
            data: result.history,
        }),
    ))
}

/// `GET /history/fetch-history`
pub async fn fetch_history(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<HistoryEnvelope>> {
    let history = state.services.history().fetch_history(&user).await?;
    Ok(Json(HistoryEnvelope {
        message: "User history retrieved!",
        status: "found",
        data: history,
    }))
}

/// `GET /history/recommendations`
pub async fn recommendations(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<RecommendationsEnvelope>> {
    let recommendations = state.services.recommender().recommend(&user).await?;
    Ok(Json(RecommendationsEnvelope {
        message: "Recommendations fetched successfully",
        recommendations,
    }))
}
