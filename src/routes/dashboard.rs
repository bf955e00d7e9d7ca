use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::feed::sort_newest_first;
use crate::models::issue::IssueStatus;
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;

/// How many open tickets the dashboard lists alongside the counters.
const PENDING_LIMIT: usize = 5;

pub async fn dashboard_handler(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
) -> Response {
    let issues = match state.db.list_issues().await {
        Ok(issues) => issues,
        Err(err) => {
            error!(?err, "failed to load issues for dashboard");
            return JsonResponse::server_error("Unable to load dashboard right now")
                .into_response();
        }
    };

    let count_for = |status: IssueStatus| {
        issues
            .iter()
            .filter(|issue| issue.status == status)
            .count()
    };
    let submitted = count_for(IssueStatus::Submitted);
    let in_progress = count_for(IssueStatus::InProgress);
    let completed = count_for(IssueStatus::Completed);
    let canceled = count_for(IssueStatus::Canceled);

    let mut pending: Vec<_> = issues
        .iter()
        .filter(|issue| issue.status.is_open())
        .cloned()
        .collect();
    sort_newest_first(&mut pending);
    pending.truncate(PENDING_LIMIT);

    let response = Json(json!({
        "success": true,
        "counts": {
            "submitted": submitted,
            "in_progress": in_progress,
            "completed": completed,
            "canceled": canceled,
            "total": issues.len(),
        },
        "pending": pending,
    }));

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        response,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::feed::IssueFeed;
    use crate::models::issue::{Department, Issue, Priority};
    use crate::routes::auth::claims::{Claims, TokenUse};
    use crate::routes::auth::session::AuthSession;
    use crate::services::object_store::MockObjectStore;
    use crate::utils::jwt::JwtKeys;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::Value;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn test_state(repo: Arc<MockDb>) -> AppState {
        AppState {
            db: repo.clone(),
            object_store: Arc::new(MockObjectStore::default()),
            feed: IssueFeed::new(repo),
            jwt_keys: JwtKeys::from_secret("0123456789abcdef0123456789abcdef").unwrap(),
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

    fn test_claims() -> Claims {
        Claims {
            id: "staff-1".into(),
            name: "Front Desk".into(),
            anonymous: true,
            exp: 0,
            iss: String::new(),
            aud: String::new(),
            token_use: TokenUse::Access,
        }
    }

    fn issue_with(title: &str, minutes_ago: i64, status: IssueStatus) -> Issue {
        let at = OffsetDateTime::now_utc() - time::Duration::minutes(minutes_ago);
        Issue {
            id: Uuid::new_v4(),
            display_id: format!("FIR-{:04}", minutes_ago),
            room_number: "Room 301".into(),
            issue_title: title.into(),
            description: "desc".into(),
            priority: Priority::Medium,
            status,
            department: Department::Unassigned,
            image_url: None,
            submitted_by: "staff-1".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn counts_cover_every_status_and_total() {
        let repo = Arc::new(MockDb::seeded(vec![
            issue_with("a", 1, IssueStatus::Submitted),
            issue_with("b", 2, IssueStatus::Submitted),
            issue_with("c", 3, IssueStatus::InProgress),
            issue_with("d", 4, IssueStatus::Completed),
            issue_with("e", 5, IssueStatus::Canceled),
        ]));
        let state = test_state(repo);

        let res = dashboard_handler(State(state), AuthSession(test_claims())).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store, no-cache, must-revalidate"
        );

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["counts"]["submitted"], 2);
        assert_eq!(json["counts"]["in_progress"], 1);
        assert_eq!(json["counts"]["completed"], 1);
        assert_eq!(json["counts"]["canceled"], 1);
        assert_eq!(json["counts"]["total"], 5);
    }

    #[tokio::test]
    async fn pending_lists_newest_open_issues_capped_at_five() {
        let mut seeded = vec![
            issue_with("closed recent", 1, IssueStatus::Completed),
            issue_with("gone", 2, IssueStatus::Canceled),
        ];
        for minutes in 0..7 {
            seeded.push(issue_with(
                &format!("open-{}", minutes),
                10 + minutes,
                if minutes % 2 == 0 {
                    IssueStatus::Submitted
                } else {
                    IssueStatus::InProgress
                },
            ));
        }
        let repo = Arc::new(MockDb::seeded(seeded));
        let state = test_state(repo);

        let res = dashboard_handler(State(state), AuthSession(test_claims())).await;
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        let pending = json["pending"].as_array().unwrap();
        assert_eq!(pending.len(), 5);
        let titles: Vec<&str> = pending
            .iter()
            .map(|issue| issue["issue_title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["open-0", "open-1", "open-2", "open-3", "open-4"]);
        assert!(titles.iter().all(|t| t.starts_with("open-")));
    }

    #[tokio::test]
    async fn repo_failure_maps_to_server_error() {
        let repo = Arc::new(MockDb {
            should_fail: true,
            ..Default::default()
        });
        let state = test_state(repo);

        let res = dashboard_handler(State(state), AuthSession(test_claims())).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
