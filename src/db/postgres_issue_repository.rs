use crate::{
    db::issue_repository::IssueRepository,
    models::issue::{FieldChange, Issue, NewIssue},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresIssueRepository {
    pub pool: PgPool,
}

#[async_trait]
impl IssueRepository for PostgresIssueRepository {
    async fn insert_issue(&self, issue: NewIssue) -> Result<Issue, sqlx::Error> {
        let result = sqlx::query_as::<_, Issue>(
            r#"
            INSERT INTO firs (display_id, room_number, issue_title, description, priority, status, department, image_url, submitted_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            RETURNING id, display_id, room_number, issue_title, description, priority, status, department, image_url, submitted_by, created_at, updated_at
            "#,
        )
        .bind(&issue.display_id)
        .bind(&issue.room_number)
        .bind(&issue.issue_title)
        .bind(&issue.description)
        .bind(issue.priority)
        .bind(issue.status)
        .bind(issue.department)
        .bind(&issue.image_url)
        .bind(&issue.submitted_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, sqlx::Error> {
        let results = sqlx::query_as::<_, Issue>(
            r#"
            SELECT id,
                   display_id,
                   room_number,
                   issue_title,
                   description,
                   priority,
                   status,
                   department,
                   image_url,
                   submitted_by,
                   created_at,
                   updated_at
            FROM firs
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    async fn find_issue_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        let result = sqlx::query_as::<_, Issue>(
            r#"
            SELECT id,
                   display_id,
                   room_number,
                   issue_title,
                   description,
                   priority,
                   status,
                   department,
                   image_url,
                   submitted_by,
                   created_at,
                   updated_at
            FROM firs
            WHERE id = $1
            "#,
        )
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn update_issue_field(
        &self,
        issue_id: Uuid,
        change: FieldChange,
    ) -> Result<Option<Issue>, sqlx::Error> {
        let returning = r#"
            RETURNING id, display_id, room_number, issue_title, description, priority, status, department, image_url, submitted_by, created_at, updated_at
            "#;

        let result = match change {
            FieldChange::Priority(priority) => {
                sqlx::query_as::<_, Issue>(&format!(
                    "UPDATE firs SET priority = $2, updated_at = now() WHERE id = $1 {}",
                    returning
                ))
                .bind(issue_id)
                .bind(priority)
                .fetch_optional(&self.pool)
                .await?
            }
            FieldChange::Status(status) => {
                sqlx::query_as::<_, Issue>(&format!(
                    "UPDATE firs SET status = $2, updated_at = now() WHERE id = $1 {}",
                    returning
                ))
                .bind(issue_id)
                .bind(status)
                .fetch_optional(&self.pool)
                .await?
            }
            FieldChange::Department(department) => {
                sqlx::query_as::<_, Issue>(&format!(
                    "UPDATE firs SET department = $2, updated_at = now() WHERE id = $1 {}",
                    returning
                ))
                .bind(issue_id)
                .bind(department)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(result)
    }

    async fn list_display_ids(&self) -> Result<Vec<String>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, String>("SELECT display_id FROM firs")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
