use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;
use models::RecordId;

use crate::{errors::JsonApiError, openapi::ApiDoc, state::ServerState};

pub mod reviews;
pub mod users;

/// Numeric `:id` path segment; anything else is a JSON 400.
pub struct IdPath(pub RecordId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<RecordId>::from_request_parts(parts, state)
            .await
            .map_err(|e| JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid id", Some(e.body_text())))?;
        Ok(IdPath(id))
    }
}

/// JSON request body; a malformed body or a field of the wrong type is a JSON 400.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = JsonApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid request body", Some(e.body_text())))?;
        Ok(JsonBody(value))
    }
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // 公共路由（健康检查 + OpenAPI 文档）
    let public = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json));

    // 用户与评论的 CRUD 路由
    let user_routes = Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", get(users::get).put(users::update).delete(users::delete));

    let review_routes = Router::new()
        .route("/api/reviews", get(reviews::list).post(reviews::create))
        .route("/api/reviews/stats/overview", get(reviews::stats))
        .route("/api/reviews/user/:user_id", get(reviews::list_by_user))
        .route("/api/reviews/:id", get(reviews::get).put(reviews::update).delete(reviews::delete));

    public
        .merge(user_routes)
        .merge(review_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
