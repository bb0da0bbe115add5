use axum::{extract::State, http::StatusCode, Json};
use common::types::Envelope;
use models::user::{NewUser, User, UserPatch};
use tracing::info;

use crate::{errors::JsonApiError, routes::{IdPath, JsonBody}, state::ServerState};

#[utoipa::path(get, path = "/api/users", tag = "users", responses((status = 200, description = "All users", body = crate::openapi::UserListDoc)))]
pub async fn list(State(state): State<ServerState>) -> Result<Json<Envelope<Vec<User>>>, JsonApiError> {
    let users = state.users.list().await?;
    Ok(Json(Envelope::list(users)))
}

#[utoipa::path(
    get, path = "/api/users/{id}", tag = "users",
    params(("id" = i64, Path, description = "User id (derived from the email)")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::UserDoc),
        (status = 404, description = "User not found")
    )
)]
pub async fn get(State(state): State<ServerState>, IdPath(id): IdPath) -> Result<Json<Envelope<User>>, JsonApiError> {
    match state.users.get(id).await? {
        Some(user) => Ok(Json(Envelope::data(user))),
        None => Err(JsonApiError::not_found("User")),
    }
}

#[utoipa::path(
    post, path = "/api/users", tag = "users",
    request_body = crate::openapi::NewUserDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::UserDoc),
        (status = 400, description = "Validation Error"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Failed to save user")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    JsonBody(input): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<Envelope<User>>), JsonApiError> {
    let user = state.users.create(input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::with_message("User created successfully", user))))
}

#[utoipa::path(
    put, path = "/api/users/{id}", tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = crate::openapi::UserPatchDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::UserDoc),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<UserPatch>,
) -> Result<Json<Envelope<User>>, JsonApiError> {
    let user = state.users.update(id, patch).await?;
    info!(old_id = id, id = user.id, "updated user");
    Ok(Json(Envelope::with_message("User updated successfully", user)))
}

#[utoipa::path(
    delete, path = "/api/users/{id}", tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted", body = crate::openapi::UserDoc),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete(State(state): State<ServerState>, IdPath(id): IdPath) -> Result<Json<Envelope<User>>, JsonApiError> {
    let user = state.users.delete(id).await?;
    Ok(Json(Envelope::with_message("User deleted successfully", user)))
}
