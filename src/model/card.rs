use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by issue ids and the cards created from them.
pub const ISSUE_ID_PREFIX: &str = "github-";

/// Sentinel used on the wire and in storage for the hidden location.
pub const HIDDEN_SENTINEL: &str = "hidden";

/// Card id for an issue placed on the board. Deterministic, so placing the
/// same issue twice converges on one card.
pub fn issue_card_id(number: u64) -> String {
    format!("{ISSUE_ID_PREFIX}{number}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Now,
    Next,
    Later,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Now, Column::Next, Column::Later];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Now => "now",
            Column::Next => "next",
            Column::Later => "later",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Column::Now => "Now",
            Column::Next => "Next",
            Column::Later => "Later",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "now" => Ok(Column::Now),
            "next" => Ok(Column::Next),
            "later" => Ok(Column::Later),
            other => Err(format!(
                "unknown column '{other}' (expected now, next or later)"
            )),
        }
    }
}

/// Where a card sits. `Hidden` is a dismissed issue: stored, never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLocation", into = "RawLocation")]
pub enum Location {
    Cell { objective: String, column: Column },
    Hidden,
}

impl Location {
    pub fn cell(objective: impl Into<String>, column: Column) -> Self {
        Location::Cell {
            objective: objective.into(),
            column,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Location::Hidden)
    }

    pub fn is_at(&self, objective: &str, column: Column) -> bool {
        match self {
            Location::Cell {
                objective: o,
                column: c,
            } => o == objective && *c == column,
            Location::Hidden => false,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Cell { objective, column } => write!(f, "{objective}/{column}"),
            Location::Hidden => f.write_str(HIDDEN_SENTINEL),
        }
    }
}

/// Wire and storage shape: `{"objective": .., "column": ..}` with the hidden
/// sentinel spelled out in both fields.
#[derive(Serialize, Deserialize)]
struct RawLocation {
    objective: String,
    column: String,
}

impl TryFrom<RawLocation> for Location {
    type Error = String;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        let objective = raw.objective.trim();
        if objective == HIDDEN_SENTINEL && raw.column == HIDDEN_SENTINEL {
            return Ok(Location::Hidden);
        }
        if objective.is_empty() {
            return Err("location objective cannot be empty".into());
        }
        if objective == HIDDEN_SENTINEL || raw.column == HIDDEN_SENTINEL {
            return Err("hidden location must set both objective and column to 'hidden'".into());
        }
        let column = raw.column.parse::<Column>()?;
        Ok(Location::cell(objective, column))
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        match location {
            Location::Cell { objective, column } => RawLocation {
                objective,
                column: column.as_str().to_string(),
            },
            Location::Hidden => RawLocation {
                objective: HIDDEN_SENTINEL.into(),
                column: HIDDEN_SENTINEL.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub url: String,
}

/// A placed card, as the board client and reconciler see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub text: String,
    pub location: Location,
    #[serde(default)]
    pub is_accent: bool,
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_issue_ref: Option<IssueRef>,
}

impl Card {
    pub fn issue_number(&self) -> Option<u64> {
        self.source_issue_ref.as_ref().map(|r| r.number)
    }
}

/// A card that has not been given an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    /// Only honored for batch seeding.
    pub id: Option<String>,
    pub text: String,
    pub location: Location,
    pub is_accent: bool,
    pub is_high_priority: bool,
    pub source_issue_ref: Option<IssueRef>,
}

impl NewCard {
    pub fn into_card(self, id: String) -> Card {
        Card {
            id,
            text: self.text,
            location: self.location,
            is_accent: self.is_accent,
            is_high_priority: self.is_high_priority,
            source_issue_ref: self.source_issue_ref,
        }
    }
}

impl From<Card> for NewCard {
    fn from(card: Card) -> Self {
        NewCard {
            id: Some(card.id),
            text: card.text,
            location: card.location,
            is_accent: card.is_accent,
            is_high_priority: card.is_high_priority,
            source_issue_ref: card.source_issue_ref,
        }
    }
}

/// Partial card update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    pub text: Option<String>,
    pub location: Option<Location>,
    pub is_accent: Option<bool>,
    pub is_high_priority: Option<bool>,
}

impl CardPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn location(location: Location) -> Self {
        Self {
            location: Some(location),
            ..Default::default()
        }
    }

    pub fn high_priority(value: bool) -> Self {
        Self {
            is_high_priority: Some(value),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.location.is_none()
            && self.is_accent.is_none()
            && self.is_high_priority.is_none()
    }

    pub fn apply(&self, card: &mut Card) {
        if let Some(text) = &self.text {
            card.text = text.clone();
        }
        if let Some(location) = &self.location {
            card.location = location.clone();
        }
        if let Some(accent) = self.is_accent {
            card.is_accent = accent;
        }
        if let Some(priority) = self.is_high_priority {
            card.is_high_priority = priority;
        }
    }
}
