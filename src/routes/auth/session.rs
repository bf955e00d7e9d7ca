use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;

use crate::routes::auth::claims::{Claims, TokenUse};
use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

pub const AUTH_COOKIE: &str = "auth_token";

/// Session guard for every staff-facing route. Pulls the `auth_token`
/// cookie, checks the signature and expiry, and only accepts tokens minted
/// for session use.
#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(AUTH_COOKIE).ok_or(StatusCode::UNAUTHORIZED)?;

        let data = decode_jwt(
            token.value(),
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

        if data.claims.token_use != TokenUse::Access {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthSession(data.claims))
    }
}
