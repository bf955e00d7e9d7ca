use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::error;

use crate::db::issue_repository::IssueRepository;
use crate::models::issue::{Issue, IssueFilter};

/// Newest submissions first. Ties keep their relative snapshot order.
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Fan-out point for live issue updates. Writers call [`IssueFeed::notify`]
/// after every successful insert or edit; each subscriber then re-reads the
/// full table and receives a fresh filtered snapshot. Subscribers that fall
/// behind coalesce missed signals into one re-read.
#[derive(Clone)]
pub struct IssueFeed {
    repo: Arc<dyn IssueRepository>,
    changes: broadcast::Sender<()>,
}

impl IssueFeed {
    pub fn new(repo: Arc<dyn IssueRepository>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self { repo, changes }
    }

    /// Signals every live subscription that the table changed. A send error
    /// only means nobody is listening.
    pub fn notify(&self) {
        let _ = self.changes.send(());
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Opens a subscription that yields the current matching snapshot
    /// immediately, then again after every change signal. A failed re-read
    /// is logged and ends the stream; dropping the subscription detaches it.
    pub fn subscribe(&self, filter: IssueFilter) -> IssueSubscription {
        let repo = Arc::clone(&self.repo);
        let mut changes = self.changes.subscribe();

        let snapshots = stream! {
            'feed: loop {
                match repo.list_issues().await {
                    Ok(issues) => {
                        let mut matching: Vec<Issue> = issues
                            .into_iter()
                            .filter(|issue| filter.matches(issue))
                            .collect();
                        sort_newest_first(&mut matching);
                        yield matching;
                    }
                    Err(err) => {
                        error!("Issue feed query failed: {:?}", err);
                        break 'feed;
                    }
                }

                loop {
                    match changes.recv().await {
                        Ok(()) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => break,
                        Err(broadcast::error::RecvError::Closed) => break 'feed,
                    }
                }
            }
        };

        IssueSubscription {
            inner: Box::pin(snapshots),
        }
    }
}

pub struct IssueSubscription {
    inner: Pin<Box<dyn Stream<Item = Vec<Issue>> + Send>>,
}

impl Stream for IssueSubscription {
    type Item = Vec<Issue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
