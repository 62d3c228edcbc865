use serde::{Deserialize, Serialize};

use crate::util::rich_text::plain_text;

/// A grid row. `label` is rich text and may carry inline HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub label: String,
}

impl Objective {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    pub fn plain_label(&self) -> String {
        plain_text(&self.label)
    }
}

const DEFAULT_ROWS: [(&str, &str); 5] = [
    ("obj1", "Increase user satisfaction with web and mobile products <strong>+5 points</strong>"),
    ("obj2", "Cut wait-time for a response by <strong>50%</strong> &mdash; target &lt; 4s / transaction"),
    ("obj3", "Ensure <strong>100%</strong> of transactions are processed correctly <em>or</em> the user is notified"),
    ("obj4", "No transactions rely on services slated for deprecation within 24 months"),
    ("obj5", "Other (does not neatly fit into a key result)"),
];

/// Rows used when the config file does not list any objectives.
pub fn default_objectives() -> Vec<Objective> {
    DEFAULT_ROWS
        .iter()
        .map(|(id, label)| Objective::new(*id, *label))
        .collect()
}
