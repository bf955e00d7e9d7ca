use async_trait::async_trait;
use uuid::Uuid;

use crate::models::issue::{FieldChange, Issue, NewIssue};

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn insert_issue(&self, issue: NewIssue) -> Result<Issue, sqlx::Error>;

    /// Returns every issue. Row order is unspecified; callers sort the
    /// snapshot themselves.
    async fn list_issues(&self) -> Result<Vec<Issue>, sqlx::Error>;

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error>;

    /// Applies a single triage edit and stamps `updated_at` on the server.
    /// Returns `None` when the issue does not exist.
    async fn update_issue_field(
        &self,
        issue_id: Uuid,
        change: FieldChange,
    ) -> Result<Option<Issue>, sqlx::Error>;

    /// Every display id currently assigned, for the ticket number allocator.
    async fn list_display_ids(&self) -> Result<Vec<String>, sqlx::Error>;
}
