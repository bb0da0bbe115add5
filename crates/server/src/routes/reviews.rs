use axum::{extract::State, http::StatusCode, Json};
use common::types::Envelope;
use models::review::{NewReview, Review, ReviewPatch};
use service::stats::ReviewStats;

use crate::{errors::JsonApiError, routes::{IdPath, JsonBody}, state::ServerState};

#[utoipa::path(get, path = "/api/reviews", tag = "reviews", responses((status = 200, description = "All reviews", body = crate::openapi::ReviewListDoc)))]
pub async fn list(State(state): State<ServerState>) -> Result<Json<Envelope<Vec<Review>>>, JsonApiError> {
    Ok(Json(Envelope::list(state.reviews.list().await?)))
}

#[utoipa::path(
    get, path = "/api/reviews/{id}", tag = "reviews",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::ReviewDoc),
        (status = 404, description = "Review not found")
    )
)]
pub async fn get(State(state): State<ServerState>, IdPath(id): IdPath) -> Result<Json<Envelope<Review>>, JsonApiError> {
    state
        .reviews
        .get(id)
        .await?
        .map(|r| Json(Envelope::data(r)))
        .ok_or_else(|| JsonApiError::not_found("Review"))
}

#[utoipa::path(
    get, path = "/api/reviews/user/{user_id}", tag = "reviews",
    params(("user_id" = i64, Path, description = "Owning user id")),
    responses((status = 200, description = "Reviews of the user", body = crate::openapi::ReviewListDoc))
)]
pub async fn list_by_user(
    State(state): State<ServerState>,
    IdPath(user_id): IdPath,
) -> Result<Json<Envelope<Vec<Review>>>, JsonApiError> {
    Ok(Json(Envelope::list(state.reviews.list_by_user(user_id).await?)))
}

#[utoipa::path(get, path = "/api/reviews/stats/overview", tag = "reviews", responses((status = 200, description = "Aggregates", body = crate::openapi::ReviewStatsDoc)))]
pub async fn stats(State(state): State<ServerState>) -> Result<Json<Envelope<ReviewStats>>, JsonApiError> {
    Ok(Json(Envelope::data(state.reviews.stats().await?)))
}

#[utoipa::path(
    post, path = "/api/reviews", tag = "reviews",
    request_body = crate::openapi::NewReviewDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::ReviewDoc),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "User not found (only when user checks are enabled)"),
        (status = 500, description = "Failed to save review")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    JsonBody(input): JsonBody<NewReview>,
) -> Result<(StatusCode, Json<Envelope<Review>>), JsonApiError> {
    let review = state.reviews.create(input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::with_message("Review created successfully", review))))
}

#[utoipa::path(
    put, path = "/api/reviews/{id}", tag = "reviews",
    params(("id" = i64, Path, description = "Review id")),
    request_body = crate::openapi::ReviewPatchDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::ReviewDoc),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<ReviewPatch>,
) -> Result<Json<Envelope<Review>>, JsonApiError> {
    let review = state.reviews.update(id, patch).await?;
    Ok(Json(Envelope::with_message("Review updated successfully", review)))
}

#[utoipa::path(
    delete, path = "/api/reviews/{id}", tag = "reviews",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Deleted", body = crate::openapi::ReviewDoc),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete(State(state): State<ServerState>, IdPath(id): IdPath) -> Result<Json<Envelope<Review>>, JsonApiError> {
    let review = state.reviews.delete(id).await?;
    Ok(Json(Envelope::with_message("Review deleted successfully", review)))
}
