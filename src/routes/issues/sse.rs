use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::StreamExt;
use tracing::error;

use crate::models::issue::IssueFilter;
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;

/// Live dashboard stream. Emits an `issues` event holding the full filtered
/// snapshot right away and again after every change; closing the response
/// drops the underlying subscription.
pub async fn issue_events(
    State(app_state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Query(filter): Query<IssueFilter>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let snapshots = app_state.feed.subscribe(filter);

    let events = snapshots.filter_map(|snapshot| {
        match Event::default().event("issues").json_data(&snapshot) {
            Ok(event) => Some(Ok::<Event, Infallible>(event)),
            Err(err) => {
                error!("Failed to encode issue snapshot: {:?}", err);
                None
            }
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::feed::IssueFeed;
    use crate::models::issue::{Department, Issue, IssueStatus, Priority};
    use crate::routes::auth::claims::{Claims, TokenUse};
    use crate::routes::auth::session::AUTH_COOKIE;
    use crate::services::object_store::MockObjectStore;
    use crate::state::AppState;
    use crate::utils::jwt::{create_jwt, JwtKeys};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::get,
        Router,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tokio::time::timeout;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn test_state(repo: Arc<MockDb>) -> AppState {
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

    fn events_app(state: AppState) -> Router {
        Router::new()
            .route("/api/issues/events", get(issue_events))
            .with_state(state)
    }

    fn session_cookie(state: &AppState) -> String {
        let claims = Claims {
            id: "staff-1".into(),
            name: "Front Desk".into(),
            anonymous: true,
            exp: (Utc::now() + ChronoDuration::hours(1)).timestamp() as usize,
            iss: String::new(),
            aud: String::new(),
            token_use: TokenUse::Access,
        };
        let token = create_jwt(
            claims,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .unwrap();
        format!("{}={}", AUTH_COOKIE, token)
    }

    fn seeded_issue(title: &str, priority: Priority) -> Issue {
        let at = OffsetDateTime::now_utc();
        Issue {
            id: Uuid::new_v4(),
            display_id: "FIR-0001".into(),
            room_number: "Room 301".into(),
            issue_title: title.into(),
            description: "desc".into(),
            priority,
            status: IssueStatus::Submitted,
            department: Department::Unassigned,
            image_url: None,
            submitted_by: "staff-1".into(),
            created_at: at,
            updated_at: at,
        }
    }

    async fn first_frame(res: axum::response::Response) -> String {
        let mut data = res.into_body().into_data_stream();
        let frame = timeout(Duration::from_secs(1), data.next())
            .await
            .expect("frame should arrive")
            .expect("stream should be open")
            .expect("frame should decode");
        String::from_utf8(frame.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stream_requires_a_session() {
        let state = test_state(Arc::new(MockDb::default()));
        let res = events_app(state)
            .oneshot(
                Request::get("/api/issues/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stream_opens_with_the_current_snapshot() {
        let repo = Arc::new(MockDb::seeded(vec![seeded_issue(
            "pipe burst",
            Priority::High,
        )]));
        let state = test_state(repo);
        let cookie = session_cookie(&state);

        let res = events_app(state)
            .oneshot(
                Request::get("/api/issues/events")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let frame = first_frame(res).await;
        assert!(frame.contains("event: issues"));
        assert!(frame.contains("pipe burst"));
    }

    #[tokio::test]
    async fn filter_in_query_narrows_the_stream() {
        let repo = Arc::new(MockDb::seeded(vec![
            seeded_issue("pipe burst", Priority::High),
            seeded_issue("dusty shelf", Priority::Low),
        ]));
        let state = test_state(repo);
        let cookie = session_cookie(&state);

        let res = events_app(state)
            .oneshot(
                Request::get("/api/issues/events?priority=high")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let frame = first_frame(res).await;
        assert!(frame.contains("pipe burst"));
        assert!(!frame.contains("dusty shelf"));
    }
}
