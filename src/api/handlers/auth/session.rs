//! Session cookie handling and the gate in front of protected routes.
//!
//! Flow Overview: read `accountd_session` from the `Cookie` header, validate
//! it with the token codec, and attach a [`Principal`] to the request. Missing
//! and bad tokens are rejected with 401 before the handler runs.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::principal::Principal;
use crate::{
    accounts::AccountService,
    api::handlers::error::error_response,
    credentials::TokenError,
};

pub const SESSION_COOKIE_NAME: &str = "accountd_session";

const CLEARED_SESSION_COOKIE: &str = "accountd_session=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

/// Build a secure `HttpOnly` cookie carrying the session token.
pub(crate) fn session_cookie(
    token: &str,
    ttl_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={ttl_seconds}"
    ))
}

pub(crate) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(CLEARED_SESSION_COOKIE)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    // Browsers may send several Cookie headers over HTTP/2.
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Reject requests without a valid session token.
///
/// On success the caller's [`Principal`] is available to the handler as an
/// `Extension<Principal>`.
pub async fn require_session(
    Extension(service): Extension<Arc<AccountService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(request.headers()) else {
        return error_response(StatusCode::UNAUTHORIZED, "authentication required");
    };

    match service.tokens().validate(&token) {
        Ok(email) => {
            request.extensions_mut().insert(Principal { email });
            next.run(request).await
        }
        Err(err) => {
            match err {
                TokenError::Expired => debug!("Rejected expired session token"),
                _ => debug!("Rejected invalid session token: {err}"),
            }
            error_response(StatusCode::UNAUTHORIZED, "invalid or expired token")
        }
    }
}
