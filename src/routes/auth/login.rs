use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use time::Duration as TimeDuration;
use tracing::{error, warn};
use uuid::Uuid;

use crate::responses::JsonResponse;
use crate::routes::auth::claims::{Claims, TokenUse};
use crate::routes::auth::session::{AuthSession, AUTH_COOKIE};
use crate::state::AppState;
use crate::utils::jwt::{create_jwt, decode_jwt};

#[derive(Deserialize)]
pub struct LoginPayload {
    /// Display name for anonymous staff sessions.
    #[serde(default)]
    pub name: Option<String>,
    /// Token minted out of band; exchanging it keeps the staff identity.
    #[serde(default)]
    pub bootstrap_token: Option<String>,
}

/// Starts a staff session. Without a bootstrap token the session is
/// anonymous under a fresh id; with one, the identity baked into the token
/// carries over.
pub async fn handle_login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let config = &app_state.config;

    let (id, name, anonymous) = if let Some(token) = payload.bootstrap_token {
        match decode_jwt(
            &token,
            &app_state.jwt_keys,
            &config.jwt_issuer,
            &config.jwt_audience,
        ) {
            Ok(data) if data.claims.token_use == TokenUse::Bootstrap => {
                (data.claims.id, data.claims.name, false)
            }
            Ok(_) => {
                warn!("Login attempted with a non-bootstrap token");
                return JsonResponse::unauthorized("Token cannot start a session").into_response();
            }
            Err(err) => {
                warn!("Bootstrap token rejected: {:?}", err);
                return JsonResponse::unauthorized("Invalid bootstrap token").into_response();
            }
        }
    } else {
        let name = payload
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Guest".to_string());
        (Uuid::new_v4().to_string(), name, true)
    };

    let expires_in = Duration::hours(config.session_ttl_hours);
    let claims = Claims {
        id,
        name,
        anonymous,
        exp: (Utc::now() + expires_in).timestamp() as usize,
        iss: String::new(),
        aud: String::new(),
        token_use: TokenUse::Access,
    };

    match create_jwt(
        claims.clone(),
        &app_state.jwt_keys,
        &config.jwt_issuer,
        &config.jwt_audience,
    ) {
        Ok(token) => {
            let cookie = Cookie::build((AUTH_COOKIE, token))
                .http_only(true)
                .secure(config.cookie_secure)
                .same_site(SameSite::Lax)
                .path("/")
                .max_age(TimeDuration::seconds(expires_in.num_seconds()))
                .build();

            let mut headers = HeaderMap::new();
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.insert(header::SET_COOKIE, value);
                }
                Err(err) => {
                    error!("Failed to build session cookie header: {:?}", err);
                    return JsonResponse::server_error("Session setup failed").into_response();
                }
            }

            (
                StatusCode::OK,
                headers,
                Json(json!({
                    "success": true,
                    "user": {
                        "id": claims.id,
                        "name": claims.name,
                        "anonymous": claims.anonymous,
                    }
                })),
            )
                .into_response()
        }
        Err(err) => {
            error!("JWT error: {:?}", err);
            JsonResponse::server_error("Token generation failed").into_response()
        }
    }
}

/// Echoes the identity behind the session cookie.
pub async fn handle_me(AuthSession(claims): AuthSession) -> Response {
    Json(json!({
        "success": true,
        "user": {
            "id": claims.id,
            "name": claims.name,
            "anonymous": claims.anonymous,
        }
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::feed::IssueFeed;
    use crate::services::object_store::MockObjectStore;
    use crate::utils::jwt::JwtKeys;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::sync::Arc;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn test_state() -> AppState {
        let repo = Arc::new(MockDb::default());
        AppState {
            db: repo.clone(),
            object_store: Arc::new(MockObjectStore::default()),
            feed: IssueFeed::new(repo),
            jwt_keys: JwtKeys::from_secret(SECRET).unwrap(),
            config: Arc::new(Config {
                database_url: String::new(),
                frontend_origin: "http://localhost:5173".into(),
                jwt_issuer: "firdesk".into(),
                jwt_audience: "firdesk-staff".into(),
                uploads_dir: "./uploads".into(),
                session_ttl_hours: 12,
                cookie_secure: false,
            }),
        }
    }

    fn set_cookie_value(response: &Response, name: &str) -> String {
        let header = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap();
        header
            .split(';')
            .next()
            .unwrap()
            .strip_prefix(&format!("{}=", name))
            .expect("cookie name should match")
            .to_string()
    }

    fn mint_token(state: &AppState, token_use: TokenUse, exp_offset_secs: i64) -> String {
        let claims = Claims {
            id: "staff-7".into(),
            name: "Ana".into(),
            anonymous: false,
            exp: (Utc::now() + Duration::seconds(exp_offset_secs)).timestamp() as usize,
            iss: String::new(),
            aud: String::new(),
            token_use,
        };
        create_jwt(
            claims,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn anonymous_login_mints_fresh_uuid_session() {
        let state = test_state();
        let response = handle_login(
            State(state.clone()),
            Json(LoginPayload {
                name: Some("Night shift".into()),
                bootstrap_token: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);

        let token = set_cookie_value(&response, AUTH_COOKIE);
        let decoded = decode_jwt(
            &token,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .expect("session token should decode");
        assert!(decoded.claims.anonymous);
        assert_eq!(decoded.claims.token_use, TokenUse::Access);
        assert!(Uuid::parse_str(&decoded.claims.id).is_ok());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["user"]["name"], "Night shift");
        assert_eq!(json["user"]["anonymous"], true);
    }

    #[tokio::test]
    async fn two_anonymous_logins_get_distinct_ids() {
        let state = test_state();
        let payload = || {
            Json(LoginPayload {
                name: None,
                bootstrap_token: None,
            })
        };

        let first = handle_login(State(state.clone()), payload()).await;
        let second = handle_login(State(state.clone()), payload()).await;

        let first_token = set_cookie_value(&first, AUTH_COOKIE);
        let second_token = set_cookie_value(&second, AUTH_COOKIE);
        let decode = |t: &str| {
            decode_jwt(
                t,
                &state.jwt_keys,
                &state.config.jwt_issuer,
                &state.config.jwt_audience,
            )
            .unwrap()
            .claims
        };
        assert_ne!(decode(&first_token).id, decode(&second_token).id);
    }

    #[tokio::test]
    async fn bootstrap_login_preserves_identity() {
        let state = test_state();
        let bootstrap = mint_token(&state, TokenUse::Bootstrap, 300);

        let response = handle_login(
            State(state.clone()),
            Json(LoginPayload {
                name: None,
                bootstrap_token: Some(bootstrap),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let token = set_cookie_value(&response, AUTH_COOKIE);
        let claims = decode_jwt(
            &token,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.id, "staff-7");
        assert_eq!(claims.name, "Ana");
        assert!(!claims.anonymous);
        assert_eq!(claims.token_use, TokenUse::Access);
    }

    #[tokio::test]
    async fn access_token_cannot_be_exchanged_as_bootstrap() {
        let state = test_state();
        let access = mint_token(&state, TokenUse::Access, 300);

        let response = handle_login(
            State(state),
            Json(LoginPayload {
                name: None,
                bootstrap_token: Some(access),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_bootstrap_token_is_rejected() {
        let state = test_state();
        let stale = mint_token(&state, TokenUse::Bootstrap, -120);

        let response = handle_login(
            State(state),
            Json(LoginPayload {
                name: None,
                bootstrap_token: Some(stale),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_echoes_session_claims() {
        let claims = Claims {
            id: "staff-7".into(),
            name: "Ana".into(),
            anonymous: false,
            exp: 0,
            iss: String::new(),
            aud: String::new(),
            token_use: TokenUse::Access,
        };

        let response = handle_me(AuthSession(claims)).await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["id"], "staff-7");
        assert_eq!(json["user"]["anonymous"], false);
    }
}
