use serde::{Deserialize, Serialize};

use super::card::{Card, IssueRef};

/// An issue from the external tracker that is not placed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Issue {
    /// The issue a card reverts to when it is taken off the board. Labels are
    /// not carried on cards, so they come back empty.
    pub fn from_card(card: &Card) -> Option<Issue> {
        let IssueRef { number, url } = card.source_issue_ref.as_ref()?;
        Some(Issue {
            id: card.id.clone(),
            number: *number,
            title: card.text.clone(),
            url: url.clone(),
            labels: Vec::new(),
        })
    }

    pub fn issue_ref(&self) -> IssueRef {
        IssueRef {
            number: self.number,
            url: self.url.clone(),
        }
    }
}
