pub mod issue_repository;
pub mod mock_db;
pub mod postgres_issue_repository;
