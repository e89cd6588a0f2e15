use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
};
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{UserCreate, UserPatch, UserRead};
use crate::error::ApiError;
use crate::filter::FilterParams;
use crate::handlers::Status;
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::{
    CreateService, DeleteService, ListService, Paginated, ReadService, ServiceError, UpdateService,
    UserService,
};

const USER_NOT_FOUND: &str = "User not found";

/// GET {prefix}/users - Paginated listing
///
/// Query: limit, offset, search, order_by (`-` prefix for descending), id__in (repeated or comma-separated)
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<UserRead>>, ApiError> {
    let filters = FilterParams::from_pairs(pairs)?;
    let service = UserService::for_user(&state.session, current.context());
    let page = service.get_paginated(&filters).await?;
    Ok(Json(page.map(UserRead::from)))
}

/// POST {prefix}/users - Admin-only create
pub async fn create(
    State(state): State<AppState>,
    admin: AdminUser,
    body: Result<Json<UserCreate>, JsonRejection>,
) -> Result<Json<UserRead>, ApiError> {
    let Json(data) = body?;
    let service = UserService::for_user(&state.session, admin.context());
    match service.create(&data).await {
        Ok(user) => Ok(Json(user.into())),
        Err(e) => {
            error!("Error during the creation: {}", e);
            Err(match e {
                e if e.is_constraint_violation() => ApiError::bad_request("An user with this email already exist"),
                ServiceError::PermissionDenied(_) => ApiError::forbidden("You are not allowed to create a user"),
                _ => ApiError::bad_request("Error during the creation"),
            })
        }
    }
}

/// GET {prefix}/users/:id - Invisible and missing users both answer 404
pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRead>, ApiError> {
    let service = UserService::for_user(&state.session, current.context());
    match service.get_by_id(id).await {
        Ok(user) => Ok(Json(user.into())),
        Err(ServiceError::NotFound(_) | ServiceError::PermissionDenied(_)) => Err(ApiError::not_found(USER_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

/// PATCH {prefix}/users/:id - Admin-only partial update
pub async fn patch(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserRead>, ApiError> {
    let Json(data) = body?;
    let service = UserService::for_user(&state.session, admin.context());
    match service.update(id, &data).await {
        Ok(user) => Ok(Json(user.into())),
        Err(ServiceError::NotFound(_)) => Err(ApiError::not_found(USER_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

/// DELETE {prefix}/users/:id - Admin-only; nobody deletes themselves
pub async fn delete(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Status>, ApiError> {
    let service = UserService::for_user(&state.session, admin.context());
    match service.delete(id).await {
        Ok(_) => Ok(Json(Status::new(format!("Deleted user {}", id)))),
        Err(ServiceError::NotFound(_)) => Err(ApiError::not_found(USER_NOT_FOUND)),
        Err(ServiceError::PermissionDenied(_)) => {
            Err(ApiError::forbidden("You are not allowed to delete yourself"))
        }
        Err(e) => Err(e.into()),
    }
}
