//! Storage and wire representation of cards.
//!
//! The database table and the HTTP API both use underscore keys and flat
//! `github_*` columns; the in-memory model uses [`Card`] with a nested
//! [`IssueRef`]. Every translation between the two lives in this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{Card, CardPatch, IssueRef, Location, NewCard};
use super::issue::Issue;
use crate::error::BoardError;

/// Largest issue number the store can hold (SQLite integers are signed).
pub const MAX_ISSUE_NUMBER: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    pub text: String,
    pub location: Location,
    #[serde(default)]
    pub is_accent: bool,
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default)]
    pub github_number: Option<u64>,
    #[serde(default)]
    pub github_url: Option<String>,
}

/// Body of `POST /cards` and one element of `POST /cards/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCardRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub location: Location,
    #[serde(default)]
    pub is_accent: bool,
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Body of `PATCH /cards/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardPatchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_accent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_high_priority: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardList {
    pub cards: Vec<CardRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueListing {
    pub issues: Vec<Issue>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub message: String,
    pub count: usize,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        let (github_number, github_url) = match card.source_issue_ref {
            Some(r) => (Some(r.number), Some(r.url)),
            None => (None, None),
        };
        CardRecord {
            id: card.id,
            text: card.text,
            location: card.location,
            is_accent: card.is_accent,
            is_high_priority: card.is_high_priority,
            github_number,
            github_url,
        }
    }
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        // A number without a url still identifies the issue; the reverse does not.
        let source_issue_ref = record.github_number.map(|number| IssueRef {
            number,
            url: record.github_url.unwrap_or_default(),
        });
        Card {
            id: record.id,
            text: record.text,
            location: record.location,
            is_accent: record.is_accent,
            is_high_priority: record.is_high_priority,
            source_issue_ref,
        }
    }
}

impl TryFrom<NewCardRecord> for NewCard {
    type Error = BoardError;

    fn try_from(record: NewCardRecord) -> Result<Self, Self::Error> {
        let source_issue_ref = match (record.github_number, record.github_url) {
            (Some(number), Some(_)) if number > MAX_ISSUE_NUMBER => {
                return Err(BoardError::Validation(format!(
                    "github_number {number} is out of range"
                )))
            }
            (Some(number), Some(url)) => Some(IssueRef { number, url }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(BoardError::Validation(
                    "github_number requires github_url".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(BoardError::Validation(
                    "github_url requires github_number".into(),
                ))
            }
        };
        if let Some(id) = &record.id {
            if id.trim().is_empty() {
                return Err(BoardError::Validation("card id cannot be empty".into()));
            }
        }
        Ok(NewCard {
            id: record.id,
            text: record.text,
            location: record.location,
            is_accent: record.is_accent,
            is_high_priority: record.is_high_priority,
            source_issue_ref,
        })
    }
}

impl NewCardRecord {
    /// Request body for creating `card`. The id is sent only for batch seeding;
    /// single creates let the server assign it.
    pub fn from_card(card: &Card, include_id: bool) -> Self {
        NewCardRecord {
            id: include_id.then(|| card.id.clone()),
            text: card.text.clone(),
            location: card.location.clone(),
            is_accent: card.is_accent,
            is_high_priority: card.is_high_priority,
            github_number: card.source_issue_ref.as_ref().map(|r| r.number),
            github_url: card.source_issue_ref.as_ref().map(|r| r.url.clone()),
        }
    }
}

impl From<CardPatchRecord> for CardPatch {
    fn from(record: CardPatchRecord) -> Self {
        CardPatch {
            text: record.text,
            location: record.location,
            is_accent: record.is_accent,
            is_high_priority: record.is_high_priority,
        }
    }
}

impl From<&CardPatch> for CardPatchRecord {
    fn from(patch: &CardPatch) -> Self {
        CardPatchRecord {
            text: patch.text.clone(),
            location: patch.location.clone(),
            is_accent: patch.is_accent,
            is_high_priority: patch.is_high_priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::Column;

    fn issue_card() -> Card {
        Card {
            id: "github-42".into(),
            text: "T".into(),
            location: Location::cell("obj1", Column::Now),
            is_accent: false,
            is_high_priority: true,
            source_issue_ref: Some(IssueRef {
                number: 42,
                url: "u".into(),
            }),
        }
    }

    #[test]
    fn record_uses_underscore_keys() {
        let json = serde_json::to_value(CardRecord::from(issue_card())).unwrap();
        assert_eq!(json["github_number"], 42);
        assert_eq!(json["github_url"], "u");
        assert_eq!(json["is_high_priority"], true);
        assert!(json.get("sourceIssueRef").is_none());
    }

    #[test]
    fn record_and_card_agree() {
        let card = issue_card();
        assert_eq!(Card::from(CardRecord::from(card.clone())), card);
    }

    #[test]
    fn native_record_has_null_github_fields() {
        let mut card = issue_card();
        card.source_issue_ref = None;
        let json = serde_json::to_value(CardRecord::from(card)).unwrap();
        assert!(json["github_number"].is_null());
        assert!(json["github_url"].is_null());
    }

    #[test]
    fn new_card_requires_paired_github_fields() {
        let record: NewCardRecord = serde_json::from_str(
            r#"{"text":"x","location":{"objective":"obj1","column":"now"},"github_number":3}"#,
        )
        .unwrap();
        let err = NewCard::try_from(record).unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn new_card_rejects_unstorable_issue_number() {
        let record: NewCardRecord = serde_json::from_str(
            r#"{"text":"x","location":{"objective":"obj1","column":"now"},"github_number":9223372036854775808,"github_url":"u"}"#,
        )
        .unwrap();
        let err = NewCard::try_from(record).unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn new_card_rejects_unknown_fields() {
        let result: Result<NewCardRecord, _> = serde_json::from_str(
            r#"{"text":"x","location":{"objective":"obj1","column":"now"},"isAccent":true}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_card_body_omits_id_unless_seeding() {
        let card = issue_card();
        let single = serde_json::to_value(NewCardRecord::from_card(&card, false)).unwrap();
        assert!(single.get("id").is_none());
        let seeded = serde_json::to_value(NewCardRecord::from_card(&card, true)).unwrap();
        assert_eq!(seeded["id"], "github-42");
    }

    #[test]
    fn patch_record_serializes_only_set_fields() {
        let patch = CardPatch::high_priority(true);
        let json = serde_json::to_value(CardPatchRecord::from(&patch)).unwrap();
        assert_eq!(json, serde_json::json!({"is_high_priority": true}));
        let back: CardPatch = serde_json::from_value::<CardPatchRecord>(json).unwrap().into();
        assert_eq!(back, patch);
    }

    #[test]
    fn listing_uses_last_refreshed_key() {
        let listing = IssueListing {
            issues: vec![],
            last_refreshed: None,
        };
        let json = serde_json::to_value(listing).unwrap();
        assert!(json.get("lastRefreshed").is_some());
    }
}
