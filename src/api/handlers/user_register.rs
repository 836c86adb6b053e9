use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    error::error_response,
    types::{ErrorResponse, UserEnvelope},
};
use crate::accounts::{models::RegisterUser, AccountService};

#[utoipa::path(
    post,
    path= "/users/register",
    request_body = RegisterUser,
    responses (
        (status = 201, description = "Registration successful", body = UserEnvelope, content_type = "application/json"),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse),
        (status = 409, description = "User with the specified email already exists", body = ErrorResponse),
    ),
    tag= "users"
)]
#[instrument(skip(service, payload))]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<RegisterUser>>,
) -> Response {
    let Some(Json(input)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    match service.register(input).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(UserEnvelope {
                message: "User created successfully".to_string(),
                data: user,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
