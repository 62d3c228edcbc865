use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::model::card::{Card, CardPatch};
use crate::model::record::{
    CardList, CardPatchRecord, CardRecord, IssueListing, NewCardRecord, RefreshSummary,
};

/// The roadmap server as the board client sees it.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_cards(&self) -> Result<Vec<Card>>;

    async fn list_issues(&self) -> Result<IssueListing>;

    async fn refresh_issues(&self) -> Result<RefreshSummary>;

    /// Returns the stored card, whose id may differ from the one sent.
    async fn create_card(&self, card: &Card) -> Result<Card>;

    async fn create_batch(&self, cards: &[NewCardRecord]) -> Result<Vec<Card>>;

    async fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Card>;

    async fn delete_card(&self, id: &str) -> Result<()>;
}

pub struct HttpBoardApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBoardApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Path of a single card. Seeded ids may contain `/`, `#` or spaces.
pub fn card_path(id: &str) -> String {
    format!("/cards/{}", urlencoding::encode(id))
}

/// Turn a non-success response into an error carrying the server's message.
async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(body);
    bail!("{what} failed ({status}): {message}");
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_cards(&self) -> Result<Vec<Card>> {
        let resp = self
            .client
            .get(self.url("/cards"))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        let list: CardList = check(resp, "Loading cards")
            .await?
            .json()
            .await
            .context("Failed to parse cards")?;
        Ok(list.cards.into_iter().map(Card::from).collect())
    }

    async fn list_issues(&self) -> Result<IssueListing> {
        let resp = self
            .client
            .get(self.url("/issues"))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        check(resp, "Loading issues")
            .await?
            .json()
            .await
            .context("Failed to parse issues")
    }

    async fn refresh_issues(&self) -> Result<RefreshSummary> {
        let resp = self
            .client
            .get(self.url("/issues/refresh"))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        check(resp, "Refreshing issues")
            .await?
            .json()
            .await
            .context("Failed to parse refresh summary")
    }

    async fn create_card(&self, card: &Card) -> Result<Card> {
        let resp = self
            .client
            .post(self.url("/cards"))
            .json(&NewCardRecord::from_card(card, false))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        let record: CardRecord = check(resp, "Creating card")
            .await?
            .json()
            .await
            .context("Failed to parse created card")?;
        Ok(record.into())
    }

    async fn create_batch(&self, cards: &[NewCardRecord]) -> Result<Vec<Card>> {
        let resp = self
            .client
            .post(self.url("/cards/batch"))
            .json(cards)
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        let list: CardList = check(resp, "Seeding cards")
            .await?
            .json()
            .await
            .context("Failed to parse seeded cards")?;
        Ok(list.cards.into_iter().map(Card::from).collect())
    }

    async fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Card> {
        let resp = self
            .client
            .patch(self.url(&card_path(id)))
            .json(&CardPatchRecord::from(patch))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        let record: CardRecord = check(resp, "Saving card")
            .await?
            .json()
            .await
            .context("Failed to parse saved card")?;
        Ok(record.into())
    }

    async fn delete_card(&self, id: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&card_path(id)))
            .send()
            .await
            .context("Failed to reach roadmap server")?;
        check(resp, "Deleting card").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_ids_are_percent_encoded() {
        let api = HttpBoardApi::new("http://localhost:5000");
        assert_eq!(api.url(&card_path("card-1")), "http://localhost:5000/cards/card-1");
        assert_eq!(
            api.url(&card_path("q3/goal #1?")),
            "http://localhost:5000/cards/q3%2Fgoal%20%231%3F"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let api = HttpBoardApi::new("http://localhost:5000/");
        assert_eq!(api.url("/cards"), "http://localhost:5000/cards");
    }
}
