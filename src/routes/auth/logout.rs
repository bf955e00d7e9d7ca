use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration as TimeDuration;
use tracing::error;

use crate::responses::JsonResponse;
use crate::routes::auth::session::AUTH_COOKIE;
use crate::state::AppState;

/// Clears the session cookie. Idempotent; succeeds with or without an
/// existing session.
pub async fn handle_logout(State(app_state): State<AppState>) -> Response {
    let expired_cookie = Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(app_state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(0));

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&expired_cookie.to_string()) {
        Ok(value) => {
            headers.insert(SET_COOKIE, value);
        }
        Err(err) => {
            error!("Failed to build logout cookie header: {:?}", err);
            return JsonResponse::server_error("Logout failed").into_response();
        }
    }

    (StatusCode::OK, headers, JsonResponse::success("Logged out")).into_response()
}
