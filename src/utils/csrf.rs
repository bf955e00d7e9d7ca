use axum::{
    body::Body,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use base64::{self, prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use rand_core::RngCore;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Double-submit check for every mutating request: the `x-csrf-token`
/// header must match the `csrf_token` cookie issued earlier.
pub async fn validate_csrf(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    if matches!(
        req.method(),
        &Method::POST | &Method::PUT | &Method::DELETE | &Method::PATCH
    ) {
        let header_token = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let cookie_header = req
            .headers()
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");

        if let Some(header_token) = header_token {
            if let Some(cookie_token) = extract_csrf_from_cookie(&cookie_header) {
                if header_token == cookie_token {
                    return Ok(next.run(req).await);
                }
            }
        }
        Err(StatusCode::FORBIDDEN)
    } else {
        Ok(next.run(req).await)
    }
}

fn extract_csrf_from_cookie(cookie_str: &str) -> Option<String> {
    for cookie in cookie_str.split(';') {
        if let Ok(parsed) = Cookie::parse_encoded(cookie.trim()) {
            if parsed.name() == CSRF_COOKIE {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32]; // 256-bit token
    rand_core::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Issues a fresh token as both a cookie and a response body so the client
/// can replay it in the `x-csrf-token` header.
pub async fn get_csrf_token() -> Response {
    let token = generate_csrf_token();

    let set_cookie_value = format!(
        "{}={}; Path=/; SameSite=Strict; HttpOnly; Secure",
        CSRF_COOKIE, token
    );

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&set_cookie_value) {
        Ok(value) => {
            headers.insert(SET_COOKIE, value);
        }
        Err(err) => {
            tracing::error!("Failed to build csrf cookie header: {:?}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (StatusCode::OK, headers, token).into_response()
}
