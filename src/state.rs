use crate::config::Config;
use crate::db::issue_repository::IssueRepository;
use crate::feed::IssueFeed;
use crate::services::object_store::ObjectStore;
use crate::utils::jwt::JwtKeys;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn IssueRepository>,
    pub object_store: Arc<dyn ObjectStore>,
    pub feed: IssueFeed,
    pub jwt_keys: JwtKeys,
    pub config: Arc<Config>,
}
