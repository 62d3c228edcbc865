use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Action, App, Focus, Mode};
use crate::client::BoardApi;
use crate::event::KeyAction;
use crate::model::card::{Card, CardPatch, Column, IssueRef, Location};
use crate::model::issue::Issue;
use crate::model::objective::default_objectives;
use crate::model::record::{IssueListing, NewCardRecord, RefreshSummary};
use crate::reconciler::is_temp_id;

/// A mock server that records every call and assigns `card-<n>` ids.
struct MockApi {
    calls: Arc<Mutex<Vec<String>>>,
    cards: Vec<Card>,
    issues: Vec<Issue>,
    next_id: Mutex<u64>,
    fail_create: bool,
}

impl MockApi {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            cards: Vec::new(),
            issues: Vec::new(),
            next_id: Mutex::new(1),
            fail_create: false,
        }
    }

    fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn assign_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        let id = format!("card-{next}");
        *next += 1;
        id
    }
}

#[async_trait]
impl BoardApi for MockApi {
    async fn list_cards(&self) -> Result<Vec<Card>> {
        self.record("list_cards".into());
        Ok(self.cards.clone())
    }

    async fn list_issues(&self) -> Result<IssueListing> {
        self.record("list_issues".into());
        Ok(IssueListing {
            issues: self.issues.clone(),
            last_refreshed: None,
        })
    }

    async fn refresh_issues(&self) -> Result<RefreshSummary> {
        self.record("refresh_issues".into());
        Ok(RefreshSummary {
            message: "refreshed".into(),
            count: self.issues.len(),
            last_refreshed: None,
        })
    }

    async fn create_card(&self, card: &Card) -> Result<Card> {
        self.record(format!("create {}", card.id));
        if self.fail_create {
            anyhow::bail!("Mock failure");
        }
        let mut stored = card.clone();
        if is_temp_id(&card.id) {
            stored.id = self.assign_id();
        }
        Ok(stored)
    }

    async fn create_batch(&self, cards: &[NewCardRecord]) -> Result<Vec<Card>> {
        self.record(format!("batch {}", cards.len()));
        Ok(cards
            .iter()
            .map(|r| Card {
                id: self.assign_id(),
                text: r.text.clone(),
                location: r.location.clone(),
                is_accent: r.is_accent,
                is_high_priority: r.is_high_priority,
                source_issue_ref: None,
            })
            .collect())
    }

    async fn update_card(&self, id: &str, _patch: &CardPatch) -> Result<Card> {
        self.record(format!("update {id}"));
        Ok(self
            .cards
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| card(id, "", Location::cell("obj1", Column::Now))))
    }

    async fn delete_card(&self, id: &str) -> Result<()> {
        self.record(format!("delete {id}"));
        Ok(())
    }
}

fn card(id: &str, text: &str, location: Location) -> Card {
    Card {
        id: id.into(),
        text: text.into(),
        location,
        is_accent: false,
        is_high_priority: false,
        source_issue_ref: None,
    }
}

fn issue(number: u64) -> Issue {
    Issue {
        id: format!("github-{number}"),
        number,
        title: format!("Issue {number}"),
        url: format!("https://github.com/octo/roadmap/issues/{number}"),
        labels: vec![],
    }
}

fn key(k: KeyAction) -> Action {
    Action::Key(k)
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.update(key(KeyAction::Char(c)));
    }
}

fn app_with(api: Arc<MockApi>) -> (App, mpsc::UnboundedReceiver<Action>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = App::new(default_objectives(), Vec::new(), api, tx);
    (app, rx)
}

fn loaded(epoch: u64, cards: Vec<Card>, issues: Vec<Issue>) -> Action {
    Action::BoardLoaded {
        epoch,
        cards,
        listing: IssueListing {
            issues,
            last_refreshed: None,
        },
    }
}

#[tokio::test]
async fn edits_to_a_pending_card_replay_under_server_id() {
    let api = Arc::new(MockApi::new());
    let (mut app, mut rx) = app_with(api.clone());

    app.update(key(KeyAction::Char('n')));
    type_text(&mut app, "Ship it");
    app.update(key(KeyAction::Select));
    assert_eq!(app.mode, Mode::Normal);
    // Only the create is on the wire; the text update waits behind it.
    assert_eq!(app.saving, 1);

    let created = rx.recv().await.unwrap();
    assert!(matches!(created, Action::CardCreated { .. }));
    app.update(created);
    let saved = rx.recv().await.unwrap();
    app.update(saved);

    assert_eq!(app.saving, 0);
    assert_eq!(api.calls(), vec!["create temp-0", "update card-1"]);
    let stored = app.board.card("card-1").unwrap();
    assert_eq!(stored.text, "Ship it");
    assert!(app.board.card("temp-0").is_none());
}

#[tokio::test]
async fn escape_on_blank_new_card_deletes_it_after_create() {
    let api = Arc::new(MockApi::new());
    let (mut app, mut rx) = app_with(api.clone());

    app.update(key(KeyAction::Char('n')));
    app.update(key(KeyAction::Escape));
    assert!(app.board.cards().is_empty());

    let created = rx.recv().await.unwrap();
    app.update(created);
    let deleted = rx.recv().await.unwrap();
    app.update(deleted);

    assert_eq!(api.calls(), vec!["create temp-0", "delete card-1"]);
    assert!(app.board.cards().is_empty());
}

#[tokio::test]
async fn failed_create_drops_queued_mutations_and_keeps_local_state() {
    let api = Arc::new(MockApi::new().with_failing_create());
    let (mut app, mut rx) = app_with(api.clone());

    app.update(key(KeyAction::Char('n')));
    type_text(&mut app, "Draft");
    app.update(key(KeyAction::Select));

    let failed = rx.recv().await.unwrap();
    assert!(matches!(failed, Action::CardCreateFailed { .. }));
    app.update(failed);

    assert_eq!(app.saving, 0);
    assert_eq!(api.calls(), vec!["create temp-0"]);
    assert!(app.flash_message.is_some());
    assert_eq!(app.board.card("temp-0").unwrap().text, "Draft");
}

#[tokio::test]
async fn stale_snapshot_is_discarded_and_reload_reruns() {
    let remote = card("card-1", "Remote", Location::cell("obj1", Column::Now));
    let api = Arc::new(MockApi::new().with_cards(vec![remote.clone()]));
    let (mut app, mut rx) = app_with(api.clone());

    app.update(loaded(0, vec![remote.clone()], vec![]));
    assert_eq!(app.board.cards().len(), 1);

    // Mutate, then a snapshot fetched before the mutation arrives.
    app.update(key(KeyAction::Char('p')));
    assert!(app.board.card("card-1").unwrap().is_high_priority);
    app.update(loaded(0, vec![remote.clone()], vec![]));
    assert!(app.board.card("card-1").unwrap().is_high_priority);

    // The update settles, which triggers the deferred reload.
    let saved = rx.recv().await.unwrap();
    assert!(matches!(saved, Action::MutationSaved));
    app.update(saved);
    let reloaded = rx.recv().await.unwrap();
    assert!(matches!(reloaded, Action::BoardLoaded { epoch: 1, .. }));
    app.update(reloaded);

    assert_eq!(
        api.calls(),
        vec!["update card-1", "list_cards", "list_issues"]
    );
    assert!(!app.board.card("card-1").unwrap().is_high_priority);
}

#[tokio::test]
async fn empty_board_is_seeded_on_start() {
    let api = Arc::new(MockApi::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let seed = vec![NewCardRecord {
        id: None,
        text: "Kickoff".into(),
        location: Location::cell("obj1", Column::Now),
        is_accent: true,
        is_high_priority: false,
        github_number: None,
        github_url: None,
    }];
    let mut app = App::new(default_objectives(), seed, api.clone(), tx);

    app.start();
    let seeded = rx.recv().await.unwrap();
    assert!(matches!(seeded, Action::Seeded(1)));
    app.update(seeded);
    let loaded = rx.recv().await.unwrap();
    app.update(loaded);

    assert_eq!(api.calls(), vec!["list_cards", "batch 1", "list_issues"]);
    assert_eq!(app.board.cards()[0].text, "Kickoff");
    assert!(!app.loading);
}

#[tokio::test]
async fn moving_an_issue_onto_the_grid_places_it() {
    let api = Arc::new(MockApi::new());
    let (mut app, mut rx) = app_with(api.clone());
    app.update(loaded(0, vec![], vec![issue(5)]));

    app.update(key(KeyAction::Tab));
    app.update(key(KeyAction::Char('m')));
    assert!(matches!(app.mode, Mode::Moving { .. }));
    assert_eq!(app.focus, Focus::Grid);
    app.update(key(KeyAction::Right));
    app.update(key(KeyAction::Select));

    let placed = app.board.card("github-5").unwrap();
    assert!(placed.location.is_at("obj1", Column::Next));
    assert_eq!(
        placed.source_issue_ref,
        Some(IssueRef {
            number: 5,
            url: "https://github.com/octo/roadmap/issues/5".into()
        })
    );
    assert!(app.board.issues().is_empty());

    let created = rx.recv().await.unwrap();
    app.update(created);
    assert_eq!(api.calls(), vec!["create github-5"]);
}

#[tokio::test]
async fn hide_and_unhide_an_issue() {
    let api = Arc::new(MockApi::new());
    let (mut app, _rx) = app_with(api);
    app.update(loaded(0, vec![], vec![issue(8)]));

    app.update(key(KeyAction::Tab));
    app.update(key(KeyAction::Char('h')));
    assert!(app.board.issues().is_empty());
    assert_eq!(app.board.hidden_cards().len(), 1);

    app.update(key(KeyAction::Char('H')));
    app.update(key(KeyAction::Char('u')));
    assert!(app.board.hidden_cards().is_empty());
    assert_eq!(app.board.issues()[0].number, 8);
}

#[tokio::test]
async fn q_types_while_editing_and_quits_otherwise() {
    let api = Arc::new(MockApi::new());
    let (mut app, _rx) = app_with(api);

    app.update(key(KeyAction::Char('n')));
    app.update(key(KeyAction::Char('q')));
    assert!(!app.should_quit);
    assert!(matches!(&app.mode, Mode::Editing { buffer, .. } if buffer == "q"));

    app.update(key(KeyAction::Select));
    app.update(key(KeyAction::Char('q')));
    assert!(app.should_quit);
}
