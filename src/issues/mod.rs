pub mod cache;
pub mod github;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::model::issue::Issue;

pub use cache::{IssueCache, RefreshOutcome};

/// An external tracker the unplaced issue list is pulled from.
#[async_trait]
pub trait IssueSource: Send + Sync {
    fn name(&self) -> &str;

    /// The complete current issue set; implementations page until exhausted.
    async fn fetch_issues(&self) -> Result<Vec<Issue>>;
}


/// The configured tracker, if any. Without a token there is nothing to query,
/// and refreshes serve the cached set.
pub fn create_source(config: &AppConfig) -> Option<Box<dyn IssueSource>> {
    let cfg = config.github.as_ref()?;
    let token = cfg.resolve_token();
    if token.is_none() {
        tracing::warn!("GitHub token not configured; issue refreshes will serve the cache");
    }
    let mut source = github::GitHubIssueSource::new(
        cfg.owner.clone(),
        cfg.repo.clone(),
        cfg.labels.clone(),
        token,
    );
    if let Some(url) = &cfg.api_url {
        source = source.with_api_url(url.clone());
    }
    Some(Box::new(source))
}
