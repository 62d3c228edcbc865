pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::card::{Card, CardPatch};
use crate::model::issue::Issue;

pub use sqlite::SqliteStore;

/// Durable home of placed cards.
///
/// Every call is its own statement; there are no multi-call transactions.
pub trait CardStore: Send + Sync {
    /// All cards in insertion order.
    fn list_cards(&self) -> Result<Vec<Card>>;

    fn get_card(&self, id: &str) -> Result<Option<Card>>;

    fn find_by_issue_number(&self, number: u64) -> Result<Option<Card>>;

    /// Insert a new card. Fails with `DuplicateCard` if the id is taken.
    fn create_card(&self, card: &Card) -> Result<()>;

    /// Returns the updated card, or `None` if the id is unknown.
    fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Option<Card>>;

    /// Returns whether a card was removed.
    fn delete_card(&self, id: &str) -> Result<bool>;
}

/// Persistent copy of the last issue set fetched from the tracker.
pub trait IssueStore: Send + Sync {
    /// Replace the stored set wholesale.
    fn replace_issues(&self, issues: &[Issue], fetched_at: DateTime<Utc>) -> Result<()>;

    fn list_issues(&self) -> Result<Vec<Issue>>;

    fn last_refreshed(&self) -> Result<Option<DateTime<Utc>>>;
}
