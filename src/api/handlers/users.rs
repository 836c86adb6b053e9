//! Session-protected user endpoints.
//!
//! Every handler here runs behind `require_session`, so a [`Principal`] is
//! always present in the request extensions.

use axum::{
    extract::{Extension, Path},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    auth::{principal::Principal, session::session_cookie},
    error::error_response,
    types::{ErrorResponse, MessageResponse, UserEnvelope, UserList, UserListResponse},
};
use crate::accounts::{
    models::{ChangePassword, UpdateUser, UserResponse},
    AccountService,
};

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 401, description = "Missing or invalid session cookie", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(requested_by = %principal.email))]
pub async fn list_users(
    Extension(principal): Extension<Principal>,
    service: Extension<Arc<AccountService>>,
) -> Response {
    match service.list_users().await {
        Ok(users) => (
            StatusCode::OK,
            Json(UserListResponse {
                requested_by: principal.email,
                data: UserList { users },
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User detail", body = UserEnvelope),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session cookie", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service))]
pub async fn get_user(Path(id): Path<String>, service: Extension<Arc<AccountService>>) -> Response {
    let Some(user_id) = parse_id(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid user id");
    };

    match service.get_user(user_id).await {
        Ok(user) => (
            StatusCode::OK,
            Json(UserEnvelope {
                message: "Find user success".to_string(),
                data: user,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session cookie", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service))]
pub async fn delete_user(
    Path(id): Path<String>,
    service: Extension<Arc<AccountService>>,
) -> Response {
    let Some(user_id) = parse_id(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid user id");
    };

    match service.delete_user(user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Delete User success".to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/users",
    request_body = UpdateUser,
    responses(
        (status = 202, description = "Profile updated, session cookie refreshed", body = UserResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session cookie", body = ErrorResponse),
        (status = 403, description = "current_email is not the logged-in account", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(email = %principal.email))]
pub async fn update_user(
    Extension(principal): Extension<Principal>,
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<UpdateUser>>,
) -> Response {
    let Some(Json(input)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    let outcome = match service.update_profile(&principal.email, input).await {
        Ok(outcome) => outcome,
        Err(err) => return err.into_response(),
    };

    // The token is bound to the email, so it must follow an email change.
    let cookie = match session_cookie(&outcome.token, service.tokens().ttl_seconds()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    (StatusCode::ACCEPTED, headers, Json(outcome.user)).into_response()
}

#[utoipa::path(
    patch,
    path = "/users",
    request_body = ChangePassword,
    responses(
        (status = 202, description = "Password changed", body = UserEnvelope),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse),
        (status = 401, description = "Missing session or wrong current password", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(email = %principal.email))]
pub async fn change_password(
    Extension(principal): Extension<Principal>,
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ChangePassword>>,
) -> Response {
    let Some(Json(input)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    match service.change_password(&principal.email, input).await {
        Ok(user) => (
            StatusCode::ACCEPTED,
            Json(UserEnvelope {
                message: "change password successfully".to_string(),
                data: user,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse::<i64>().ok().filter(|id| *id > 0)
}
