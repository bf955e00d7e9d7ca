use async_trait::async_trait;
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::issue_repository::IssueRepository;
use crate::models::issue::{FieldChange, Issue, NewIssue};

/// In-memory repository for handler tests. Issues keep insertion order so
/// tests can prove callers do their own sorting.
#[derive(Default)]
pub struct MockDb {
    pub issues: Mutex<Vec<Issue>>,
    pub should_fail: bool,
    pub fail_inserts: bool,
}

impl MockDb {
    pub fn seeded(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Default::default()
        }
    }

    fn guard(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueRepository for MockDb {
    async fn insert_issue(&self, issue: NewIssue) -> Result<Issue, sqlx::Error> {
        self.guard()?;
        if self.fail_inserts {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }

        let now = OffsetDateTime::now_utc();
        let stored = Issue {
            id: Uuid::new_v4(),
            display_id: issue.display_id,
            room_number: issue.room_number,
            issue_title: issue.issue_title,
            description: issue.description,
            priority: issue.priority,
            status: issue.status,
            department: issue.department,
            image_url: issue.image_url,
            submitted_by: issue.submitted_by,
            created_at: now,
            updated_at: now,
        };
        self.issues.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, sqlx::Error> {
        self.guard()?;
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .find(|issue| issue.id == issue_id)
            .cloned())
    }

    async fn update_issue_field(
        &self,
        issue_id: Uuid,
        change: FieldChange,
    ) -> Result<Option<Issue>, sqlx::Error> {
        self.guard()?;
        let mut issues = self.issues.lock().unwrap();
        let Some(issue) = issues.iter_mut().find(|issue| issue.id == issue_id) else {
            return Ok(None);
        };
        change.apply(issue);
        issue.updated_at = OffsetDateTime::now_utc();
        Ok(Some(issue.clone()))
    }

    async fn list_display_ids(&self) -> Result<Vec<String>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .map(|issue| issue.display_id.clone())
            .collect())
    }
}
