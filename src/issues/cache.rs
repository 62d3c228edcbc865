use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::IssueSource;
use crate::error::{BoardError, Result};
use crate::model::issue::Issue;
use crate::store::IssueStore;

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub count: usize,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// True when the tracker could not be reached and the cached set was served.
    pub from_cache: bool,
}

#[derive(Default)]
struct Snapshot {
    issues: Vec<Issue>,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Last known issue set from the tracker, mirrored to the store so it
/// survives restarts and tracker outages.
pub struct IssueCache {
    store: Arc<dyn IssueStore>,
    source: Option<Box<dyn IssueSource>>,
    snapshot: RwLock<Snapshot>,
}

impl IssueCache {
    pub fn new(store: Arc<dyn IssueStore>, source: Option<Box<dyn IssueSource>>) -> Result<Self> {
        let snapshot = Snapshot {
            issues: store.list_issues()?,
            last_refreshed: store.last_refreshed()?,
        };
        tracing::debug!(count = snapshot.issues.len(), "loaded cached issues");
        Ok(Self {
            store,
            source,
            snapshot: RwLock::new(snapshot),
        })
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(source) = &self.source else {
            tracing::warn!("no issue source configured; serving cached issues");
            return Ok(self.cached_outcome());
        };

        // Fetch before taking the lock so readers never wait on the network.
        let fetched = match source.fetch_issues().await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "issue refresh failed; serving cached issues");
                return Ok(self.cached_outcome());
            }
        };

        let issues = dedupe_by_number(fetched);
        let now = Utc::now();
        self.store.replace_issues(&issues, now)?;

        let count = issues.len();
        {
            let mut snap = self.write()?;
            snap.issues = issues;
            snap.last_refreshed = Some(now);
        }
        tracing::info!(source = source.name(), count, "issue cache refreshed");

        Ok(RefreshOutcome {
            count,
            last_refreshed: Some(now),
            from_cache: false,
        })
    }

    /// Cached issues minus those already placed on the board.
    pub fn list(&self, placed_numbers: &HashSet<u64>) -> Vec<Issue> {
        self.read()
            .issues
            .iter()
            .filter(|issue| !placed_numbers.contains(&issue.number))
            .cloned()
            .collect()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.read().last_refreshed
    }

    pub fn len(&self) -> usize {
        self.read().issues.len()
    }

    fn cached_outcome(&self) -> RefreshOutcome {
        let snap = self.read();
        RefreshOutcome {
            count: snap.issues.len(),
            last_refreshed: snap.last_refreshed,
            from_cache: true,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        // A poisoned snapshot is still a complete value; writers swap fields whole.
        self.snapshot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Snapshot>> {
        self.snapshot
            .write()
            .map_err(|_| BoardError::Internal("issue cache lock poisoned".into()))
    }
}

/// Keep the first occurrence of each issue number.
fn dedupe_by_number(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.number))
        .collect()
}
