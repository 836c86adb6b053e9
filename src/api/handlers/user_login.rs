use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    auth::session::{clear_session_cookie, extract_session_token, session_cookie},
    error::{error_response, INVALID_CREDENTIALS},
    types::{ErrorResponse, LoginData, LoginResponse, MessageResponse},
};
use crate::accounts::{models::LoginUser, AccountError, AccountService};

#[utoipa::path(
    post,
    path= "/users/login",
    request_body = LoginUser,
    responses (
        (status = 202, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing or malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
    ),
    tag= "users"
)]
#[instrument(skip(service, payload))]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<LoginUser>>,
) -> Response {
    let Some(Json(input)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    let outcome = match service.login(input).await {
        Ok(outcome) => outcome,
        // Unknown email and wrong password look the same from outside.
        Err(AccountError::IdentityNotFound | AccountError::CredentialMismatch) => {
            return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
        }
        Err(err) => return err.into_response(),
    };

    let cookie = match session_cookie(&outcome.token, service.tokens().ttl_seconds()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    (
        StatusCode::ACCEPTED,
        headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            data: LoginData {
                user: outcome.user,
                token: outcome.token,
            },
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path= "/users/logout",
    responses (
        (status = 200, description = "Session cookie cleared", body = MessageResponse),
    ),
    tag= "users"
)]
#[instrument(skip(service, headers))]
pub async fn logout(service: Extension<Arc<AccountService>>, headers: HeaderMap) -> Response {
    let email = extract_session_token(&headers).and_then(|token| service.tokens().validate(&token).ok());
    service.logout(email.as_deref());

    // Always clear the cookie, even without a valid session.
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());

    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: "logout success".to_string(),
        }),
    )
        .into_response()
}
