use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use service::errors::ServiceError;
use service::file::user_store::{User, UserInput};
use service::storage::json_snapshot_store::Snapshot;

use crate::errors::JsonApiError;
use crate::routes::ServerState;

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: u64,
    pub user: User,
}

#[utoipa::path(
    get, path = "/users", tag = "users",
    responses((status = 200, description = "Map of user id to user"))
)]
pub async fn list_users(State(state): State<ServerState>) -> Json<Snapshot<User>> {
    Json(state.users.list().await)
}

#[utoipa::path(
    get, path = "/users/{id}", tag = "users",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> Result<Json<BTreeMap<u64, User>>, JsonApiError> {
    match state.users.get(id).await {
        Ok(user) => Ok(Json(BTreeMap::from([(id, user)]))),
        Err(ServiceError::NotFound(_)) => {
            Err(JsonApiError::new(StatusCode::NOT_FOUND, "User not found", None))
        }
        Err(e) => {
            error!(err = %e, "get user failed");
            Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Failure", Some(e.to_string())))
        }
    }
}

#[utoipa::path(
    post, path = "/users", tag = "users",
    request_body = crate::openapi::UserInputDoc,
    responses(
        (status = 201, description = "User created", body = crate::openapi::CreatedUserDoc),
        (status = 400, description = "Invalid input"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create_user(
    State(state): State<ServerState>,
    payload: Option<Json<UserInput>>,
) -> Result<(StatusCode, Json<CreatedUser>), JsonApiError> {
    // A missing or non-JSON body is treated as an empty object, which then
    // fails the required-field check.
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    match state.users.create(input).await {
        Ok((id, user)) => {
            info!(id, "created user");
            Ok((StatusCode::CREATED, Json(CreatedUser { id, user })))
        }
        Err(e) => match e {
            ServiceError::Validation(msg) => {
                Err(JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid data", Some(msg)))
            }
            _ => {
                error!(err = %e, "create user failed");
                Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Failure", Some(e.to_string())))
            }
        },
    }
}

#[utoipa::path(
    put, path = "/users/{id}", tag = "users",
    params(("id" = u64, Path, description = "User ID")),
    request_body = crate::openapi::UserInputDoc,
    responses(
        (status = 200, description = "User updated"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn update_user(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    payload: Option<Json<UserInput>>,
) -> Result<Json<BTreeMap<u64, User>>, JsonApiError> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    match state.users.update(id, input).await {
        Ok(user) => {
            info!(id, "updated user");
            Ok(Json(BTreeMap::from([(id, user)])))
        }
        Err(ServiceError::NotFound(_)) => {
            Err(JsonApiError::new(StatusCode::NOT_FOUND, "User not found", None))
        }
        Err(e) => {
            error!(err = %e, "update user failed");
            Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Failure", Some(e.to_string())))
        }
    }
}

#[utoipa::path(
    delete, path = "/users/{id}", tag = "users",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn delete_user(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    match state.users.delete(id).await {
        Ok(user) => {
            info!(id, "deleted user");
            Ok(Json(serde_json::json!({ "deleted": BTreeMap::from([(id, user)]) })))
        }
        Err(ServiceError::NotFound(_)) => {
            Err(JsonApiError::new(StatusCode::NOT_FOUND, "User not found", None))
        }
        Err(e) => {
            error!(err = %e, "delete user failed");
            Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Failure", Some(e.to_string())))
        }
    }
}
