//! Server-side card and issue operations, shared by every HTTP handler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BoardError, Result};
use crate::issues::IssueCache;
use crate::model::card::{issue_card_id, Card, CardPatch, NewCard};
use crate::model::record::{IssueListing, RefreshSummary};
use crate::store::CardStore;

const NATIVE_ID_PREFIX: &str = "card-";

/// Hands out `card-<n>` ids, starting past the highest one already stored.
#[derive(Debug)]
pub struct CardIdGenerator {
    next: AtomicU64,
}

impl CardIdGenerator {
    pub fn seeded(cards: &[Card]) -> Self {
        let gen = Self {
            next: AtomicU64::new(1),
        };
        for card in cards {
            gen.observe(&card.id);
        }
        gen
    }

    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{NATIVE_ID_PREFIX}{n}")
    }

    /// Make sure future ids skip past `id` if it is a `card-<n>` id.
    pub fn observe(&self, id: &str) {
        if let Some(n) = id
            .strip_prefix(NATIVE_ID_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
        {
            self.next.fetch_max(n + 1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub cards: usize,
    pub issues: usize,
}

pub struct RoadmapService {
    cards: Arc<dyn CardStore>,
    issues: IssueCache,
    ids: CardIdGenerator,
}

impl RoadmapService {
    pub fn new(cards: Arc<dyn CardStore>, issues: IssueCache) -> Result<Self> {
        let ids = CardIdGenerator::seeded(&cards.list_cards()?);
        Ok(Self { cards, issues, ids })
    }

    pub fn list_cards(&self) -> Result<Vec<Card>> {
        self.cards.list_cards()
    }

    pub fn get_card(&self, id: &str) -> Result<Card> {
        self.cards
            .get_card(id)?
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))
    }

    /// Store a new card. Returns the card and whether it was newly created.
    ///
    /// An issue already held by a card is never placed twice: the holder is
    /// moved to the requested location and returned instead.
    pub fn create_card(&self, new: NewCard) -> Result<(Card, bool)> {
        if let Some(number) = new.source_issue_ref.as_ref().map(|r| r.number) {
            if let Some(existing) = self.cards.find_by_issue_number(number)? {
                tracing::info!(card = %existing.id, number, "issue already placed; moving existing card");
                if existing.location == new.location {
                    return Ok((existing, false));
                }
                let patch = CardPatch::location(new.location);
                let moved = self
                    .cards
                    .update_card(&existing.id, &patch)?
                    .ok_or_else(|| BoardError::CardNotFound(existing.id.clone()))?;
                return Ok((moved, false));
            }
        }

        let id = match (&new.id, new.source_issue_ref.as_ref()) {
            (Some(id), _) => id.clone(),
            (None, Some(r)) => issue_card_id(r.number),
            (None, None) => self.ids.next_id(),
        };
        self.ids.observe(&id);

        let card = new.into_card(id);
        self.cards.create_card(&card)?;
        tracing::info!(card = %card.id, location = %card.location, "card created");
        Ok((card, true))
    }

    /// Create cards one after another, honoring client ids. Stops at the
    /// first failure; earlier cards stay stored.
    pub fn create_batch(&self, cards: Vec<NewCard>) -> Result<Vec<Card>> {
        let mut created = Vec::with_capacity(cards.len());
        for new in cards {
            let (card, _) = self.create_card(new)?;
            created.push(card);
        }
        tracing::info!(count = created.len(), "batch created");
        Ok(created)
    }

    pub fn update_card(&self, id: &str, patch: CardPatch) -> Result<Card> {
        if patch.is_empty() {
            return self.get_card(id);
        }
        if let Some(text) = &patch.text {
            if text.trim().is_empty() {
                return Err(BoardError::Validation("card text cannot be empty".into()));
            }
        }
        let card = self
            .cards
            .update_card(id, &patch)?
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))?;
        tracing::debug!(card = %id, "card updated");
        Ok(card)
    }

    pub fn delete_card(&self, id: &str) -> Result<()> {
        if !self.cards.delete_card(id)? {
            return Err(BoardError::CardNotFound(id.to_string()));
        }
        tracing::info!(card = %id, "card deleted");
        Ok(())
    }

    /// Cached issues not yet on the board.
    pub fn list_issues(&self) -> Result<IssueListing> {
        let placed = self.placed_numbers()?;
        Ok(IssueListing {
            issues: self.issues.list(&placed),
            last_refreshed: self.issues.last_refreshed(),
        })
    }

    pub async fn refresh_issues(&self) -> Result<RefreshSummary> {
        let outcome = self.issues.refresh().await?;
        let message = if outcome.from_cache {
            "GitHub unavailable; serving cached issues"
        } else {
            "GitHub issues refreshed successfully"
        };
        Ok(RefreshSummary {
            message: message.to_string(),
            count: outcome.count,
            last_refreshed: outcome.last_refreshed,
        })
    }

    pub fn status(&self) -> Result<StatusSummary> {
        let cards = self.cards.list_cards()?.len();
        Ok(StatusSummary {
            cards,
            issues: self.issues.len(),
        })
    }

    fn placed_numbers(&self) -> Result<HashSet<u64>> {
        Ok(self
            .cards
            .list_cards()?
            .iter()
            .filter_map(Card::issue_number)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::{Column, IssueRef, Location};
    use crate::model::issue::Issue;
    use crate::store::{IssueStore, SqliteStore};

    fn service_with(store: Arc<SqliteStore>) -> RoadmapService {
        let cache = IssueCache::new(store.clone(), None).unwrap();
        RoadmapService::new(store, cache).unwrap()
    }

    fn service() -> RoadmapService {
        service_with(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    fn native(text: &str) -> NewCard {
        NewCard {
            id: None,
            text: text.into(),
            location: Location::cell("obj1", Column::Now),
            is_accent: false,
            is_high_priority: false,
            source_issue_ref: None,
        }
    }

    fn from_issue(number: u64, location: Location) -> NewCard {
        NewCard {
            id: None,
            text: format!("Issue {number}"),
            location,
            is_accent: false,
            is_high_priority: false,
            source_issue_ref: Some(IssueRef {
                number,
                url: format!("https://github.com/octo/roadmap/issues/{number}"),
            }),
        }
    }

    #[test]
    fn native_cards_get_sequential_ids() {
        let svc = service();
        let (a, created) = svc.create_card(native("a")).unwrap();
        let (b, _) = svc.create_card(native("b")).unwrap();
        assert!(created);
        assert_eq!(a.id, "card-1");
        assert_eq!(b.id, "card-2");
    }

    #[test]
    fn issue_cards_use_issue_id() {
        let svc = service();
        let (card, _) = svc
            .create_card(from_issue(42, Location::cell("obj2", Column::Later)))
            .unwrap();
        assert_eq!(card.id, "github-42");
    }

    #[test]
    fn placing_a_placed_issue_moves_the_existing_card() {
        let svc = service();
        svc.create_card(from_issue(42, Location::cell("obj1", Column::Now)))
            .unwrap();
        let (card, created) = svc
            .create_card(from_issue(42, Location::cell("obj3", Column::Next)))
            .unwrap();
        assert!(!created);
        assert_eq!(card.id, "github-42");
        assert!(card.location.is_at("obj3", Column::Next));
        assert_eq!(svc.list_cards().unwrap().len(), 1);
    }

    #[test]
    fn batch_advances_id_counter() {
        let svc = service();
        let mut seeded = native("seeded");
        seeded.id = Some("card-10".into());
        svc.create_batch(vec![seeded]).unwrap();

        let (card, _) = svc.create_card(native("next")).unwrap();
        assert_eq!(card.id, "card-11");
    }

    #[test]
    fn counter_resumes_past_stored_cards() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        {
            let svc = service_with(store.clone());
            svc.create_card(native("a")).unwrap();
            svc.create_card(native("b")).unwrap();
        }
        let svc = service_with(store);
        let (card, _) = svc.create_card(native("c")).unwrap();
        assert_eq!(card.id, "card-3");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_card("card-9"),
            Err(BoardError::CardNotFound(_))
        ));
        assert!(matches!(
            svc.update_card("card-9", CardPatch::text("x")),
            Err(BoardError::CardNotFound(_))
        ));
        assert!(matches!(
            svc.delete_card("card-9"),
            Err(BoardError::CardNotFound(_))
        ));
    }

    #[test]
    fn blank_text_patch_is_rejected() {
        let svc = service();
        let (card, _) = svc.create_card(native("a")).unwrap();
        assert!(matches!(
            svc.update_card(&card.id, CardPatch::text("   ")),
            Err(BoardError::Validation(_))
        ));
    }

    #[test]
    fn listed_issues_exclude_placed_numbers() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let issues: Vec<Issue> = (1..=3)
            .map(|n| Issue {
                id: issue_card_id(n),
                number: n,
                title: format!("Issue {n}"),
                url: String::new(),
                labels: vec![],
            })
            .collect();
        store.replace_issues(&issues, chrono::Utc::now()).unwrap();
        let svc = service_with(store);

        svc.create_card(from_issue(1, Location::cell("obj1", Column::Now)))
            .unwrap();
        svc.create_card(from_issue(3, Location::Hidden)).unwrap();

        let listing = svc.list_issues().unwrap();
        assert_eq!(listing.issues.len(), 1);
        assert_eq!(listing.issues[0].number, 2);
        assert!(listing.last_refreshed.is_some());
    }

    #[tokio::test]
    async fn refresh_without_source_reports_cache() {
        let svc = service();
        let summary = svc.refresh_issues().await.unwrap();
        assert_eq!(summary.count, 0);
        assert!(summary.message.contains("cached"));
    }
}
