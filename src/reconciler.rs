//! Client-side card/issue reconciliation.
//!
//! [`Reconciler`] holds the board as the user sees it: placed cards and the
//! issues not yet on the board. Every operation updates that state at once and
//! returns the [`Mutation`]s the durable store needs to catch up. Callers send
//! them wherever they like; nothing here waits on or rolls back for them.
//!
//! Invariants kept after every operation:
//! - no two cards carry the same issue number;
//! - no unplaced issue shares a number with a card.
//!
//! Unknown ids are always a no-op.

use std::collections::HashSet;

use crate::model::card::{issue_card_id, Card, CardPatch, Column, Location};
use crate::model::issue::Issue;

/// A change the durable store must apply to match local state.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { card: Card },
    Update { id: String, patch: CardPatch },
    Delete { id: String },
}

impl Mutation {
    /// Id of the card the mutation targets.
    pub fn card_id(&self) -> &str {
        match self {
            Mutation::Create { card } => &card.id,
            Mutation::Update { id, .. } | Mutation::Delete { id } => id,
        }
    }

    pub fn with_card_id(self, new_id: &str) -> Mutation {
        match self {
            Mutation::Create { mut card } => {
                card.id = new_id.to_string();
                Mutation::Create { card }
            }
            Mutation::Update { patch, .. } => Mutation::Update {
                id: new_id.to_string(),
                patch,
            },
            Mutation::Delete { .. } => Mutation::Delete {
                id: new_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    cards: Vec<Card>,
    issues: Vec<Issue>,
    next_temp: u64,
}

const TEMP_ID_PREFIX: &str = "temp-";

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

impl Reconciler {
    pub fn new(cards: Vec<Card>, issues: Vec<Issue>) -> Self {
        let mut reconciler = Self::default();
        reconciler.replace(cards, issues);
        reconciler
    }

    /// Replace local state with a durable snapshot. Issues already on a card
    /// are dropped, matching the server's read-time filter.
    pub fn replace(&mut self, cards: Vec<Card>, issues: Vec<Issue>) {
        let placed: HashSet<u64> = cards.iter().filter_map(Card::issue_number).collect();
        let mut seen = HashSet::new();
        self.issues = issues
            .into_iter()
            .filter(|i| !placed.contains(&i.number) && seen.insert(i.number))
            .collect();
        self.cards = cards;
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn cards_at(&self, objective: &str, column: Column) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|c| c.location.is_at(objective, column))
            .collect()
    }

    pub fn hidden_cards(&self) -> Vec<&Card> {
        self.cards.iter().filter(|c| c.location.is_hidden()).collect()
    }

    /// Create an empty card at a cell. The returned id is usable right away,
    /// e.g. to enter edit mode; it is temporary until the server assigns one.
    pub fn place_new_card(
        &mut self,
        objective: &str,
        column: Column,
        text: &str,
    ) -> (String, Vec<Mutation>) {
        let id = format!("{TEMP_ID_PREFIX}{}", self.next_temp);
        self.next_temp += 1;
        let card = Card {
            id: id.clone(),
            text: text.trim().to_string(),
            location: Location::cell(objective, column),
            is_accent: false,
            is_high_priority: false,
            source_issue_ref: None,
        };
        self.cards.push(card.clone());
        (id, vec![Mutation::Create { card }])
    }

    /// Commit edited text. Blank text deletes the card.
    pub fn update_card_text(&mut self, id: &str, new_text: &str) -> Vec<Mutation> {
        let text = new_text.trim();
        if text.is_empty() {
            return self.delete_card(id);
        }
        let Some(card) = self.cards.iter_mut().find(|c| c.id == id) else {
            return Vec::new();
        };
        if card.text == text {
            return Vec::new();
        }
        card.text = text.to_string();
        vec![Mutation::Update {
            id: id.to_string(),
            patch: CardPatch::text(text),
        }]
    }

    /// Remove a card. A card that came from an issue goes back to the
    /// unplaced list instead of disappearing.
    pub fn delete_card(&mut self, id: &str) -> Vec<Mutation> {
        let Some(index) = self.cards.iter().position(|c| c.id == id) else {
            return Vec::new();
        };
        let card = self.cards.remove(index);
        if let Some(issue) = Issue::from_card(&card) {
            if !self.issues.iter().any(|i| i.number == issue.number) {
                self.issues.push(issue);
            }
        }
        vec![Mutation::Delete { id: card.id }]
    }

    /// Move a card, or place an unplaced issue when `id` names one.
    pub fn move_card(&mut self, id: &str, location: Location) -> Vec<Mutation> {
        if self.issues.iter().any(|i| i.id == id) {
            return self.place_issue(id, location);
        }
        let Some(card) = self.card(id) else {
            return Vec::new();
        };

        let mut mutations = Vec::new();
        let mut target = id.to_string();
        if let Some(number) = card.issue_number() {
            let holders: Vec<String> = self
                .cards
                .iter()
                .filter(|c| c.issue_number() == Some(number))
                .map(|c| c.id.clone())
                .collect();
            if holders.len() > 1 {
                let canonical_id = issue_card_id(number);
                target = if holders.contains(&canonical_id) {
                    canonical_id
                } else {
                    holders[0].clone()
                };
                for duplicate in holders.iter().filter(|h| **h != target) {
                    self.cards.retain(|c| &c.id != duplicate);
                    mutations.push(Mutation::Delete {
                        id: duplicate.clone(),
                    });
                }
            }
        }

        mutations.extend(self.relocate(&target, location));
        mutations
    }

    /// Turn an unplaced issue into a card at `location`.
    pub fn place_issue(&mut self, issue_id: &str, location: Location) -> Vec<Mutation> {
        let Some(index) = self.issues.iter().position(|i| i.id == issue_id) else {
            return Vec::new();
        };
        let issue = self.issues.remove(index);
        // Drop any other entries for the same number, whatever their id.
        self.issues.retain(|i| i.number != issue.number);

        let existing = self
            .cards
            .iter()
            .find(|c| c.issue_number() == Some(issue.number))
            .map(|c| c.id.clone());
        if let Some(existing) = existing {
            return self.relocate(&existing, location);
        }

        let card = Card {
            id: issue_card_id(issue.number),
            text: issue.title.clone(),
            location,
            is_accent: false,
            is_high_priority: false,
            source_issue_ref: Some(issue.issue_ref()),
        };
        self.cards.push(card.clone());
        vec![Mutation::Create { card }]
    }

    pub fn toggle_high_priority(&mut self, id: &str, value: bool) -> Vec<Mutation> {
        let Some(card) = self.cards.iter_mut().find(|c| c.id == id) else {
            return Vec::new();
        };
        card.is_high_priority = value;
        vec![Mutation::Update {
            id: id.to_string(),
            patch: CardPatch::high_priority(value),
        }]
    }

    /// Dismiss an issue. It becomes a card in the hidden location, which keeps
    /// it out of the unplaced list across refreshes.
    pub fn hide_issue(&mut self, issue_id: &str) -> Vec<Mutation> {
        self.place_issue(issue_id, Location::Hidden)
    }

    /// Bring a dismissed issue back to the unplaced list.
    pub fn unhide_card(&mut self, id: &str) -> Vec<Mutation> {
        match self.card(id) {
            Some(card) if card.location.is_hidden() => self.delete_card(id),
            _ => Vec::new(),
        }
    }

    /// Adopt the id the server assigned to a card created under a temporary id.
    pub fn rename_card(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if self.card(to).is_some() {
            // The server answered with a card we already hold; drop the copy.
            self.cards.retain(|c| c.id != from);
            return;
        }
        if let Some(card) = self.cards.iter_mut().find(|c| c.id == from) {
            card.id = to.to_string();
        }
    }

    fn relocate(&mut self, id: &str, location: Location) -> Vec<Mutation> {
        let Some(card) = self.cards.iter_mut().find(|c| c.id == id) else {
            return Vec::new();
        };
        if card.location == location {
            return Vec::new();
        }
        card.location = location.clone();
        vec![Mutation::Update {
            id: id.to_string(),
            patch: CardPatch::location(location),
        }]
    }
}
