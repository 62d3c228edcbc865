use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::client::BoardApi;
use crate::event::KeyAction;
use crate::model::card::{Card, Column, Location};
use crate::model::objective::Objective;
use crate::model::record::{IssueListing, NewCardRecord, RefreshSummary};
use crate::reconciler::{Mutation, Reconciler};

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    Tick,
    /// A server snapshot, tagged with the mutation epoch at which the fetch began.
    BoardLoaded {
        epoch: u64,
        cards: Vec<Card>,
        listing: IssueListing,
    },
    FetchError(String),
    Seeded(usize),
    CardCreated {
        local_id: String,
        card: Card,
    },
    CardCreateFailed {
        local_id: String,
        error: String,
    },
    MutationSaved,
    MutationFailed(String),
    IssuesRefreshed(RefreshSummary),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Grid,
    Issues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Editing { card_id: String, buffer: String },
    /// Carrying a card or unplaced issue; Enter drops it on the grid cursor.
    Moving { id: String, label: String },
}

pub struct App {
    pub board: Reconciler,
    pub objectives: Vec<Objective>,
    pub focus: Focus,
    pub mode: Mode,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub cursor_slot: usize,
    pub selected_issue: usize,
    pub show_hidden: bool,
    pub loading: bool,
    /// Requests in flight.
    pub saving: usize,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub flash_message: Option<(String, Instant)>,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    api: Arc<dyn BoardApi>,
    seed: Vec<NewCardRecord>,
    /// Bumped on every mutation; a snapshot fetched under an older epoch is stale.
    mutation_epoch: u64,
    reload_pending: bool,
    /// Mutations held back until the create of their card settles, keyed by
    /// the card's local id.
    awaiting: HashMap<String, Vec<Mutation>>,
}

impl App {
    pub fn new(
        objectives: Vec<Objective>,
        seed: Vec<NewCardRecord>,
        api: Arc<dyn BoardApi>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            board: Reconciler::new(Vec::new(), Vec::new()),
            objectives,
            focus: Focus::Grid,
            mode: Mode::Normal,
            cursor_row: 0,
            cursor_col: 0,
            cursor_slot: 0,
            selected_issue: 0,
            show_hidden: false,
            loading: false,
            saving: 0,
            last_refreshed: None,
            flash_message: None,
            should_quit: false,
            action_tx,
            api,
            seed,
            mutation_epoch: 0,
            reload_pending: false,
            awaiting: HashMap::new(),
        }
    }

    /// First load. Seeds the server if it has no cards and seed cards are configured.
    pub fn start(&mut self) {
        let seed = std::mem::take(&mut self.seed);
        self.spawn_fetch(seed);
    }

    pub fn update(&mut self, action: Action) {
        // Clear flash message after 3 seconds
        if let Some((_, t)) = &self.flash_message {
            if t.elapsed().as_secs() >= 3 {
                self.flash_message = None;
            }
        }

        match action {
            Action::Key(key) => self.handle_key(key),
            Action::Tick => {}
            Action::BoardLoaded {
                epoch,
                cards,
                listing,
            } => {
                self.loading = false;
                if epoch == self.mutation_epoch && self.saving == 0 {
                    self.board.replace(cards, listing.issues);
                    self.last_refreshed = listing.last_refreshed;
                    self.clamp_cursor();
                } else {
                    tracing::debug!(epoch, current = self.mutation_epoch, saving = self.saving, "discarding stale snapshot");
                    self.reload_pending = true;
                    self.settle();
                }
            }
            Action::FetchError(msg) => {
                self.loading = false;
                self.flash(format!("Fetch error: {msg}"));
            }
            Action::Seeded(count) => {
                self.flash(format!("Seeded {count} cards"));
            }
            Action::CardCreated { local_id, card } => {
                self.saving = self.saving.saturating_sub(1);
                self.card_created(&local_id, &card);
                self.settle();
            }
            Action::CardCreateFailed { local_id, error } => {
                self.saving = self.saving.saturating_sub(1);
                let dropped = self.awaiting.remove(&local_id).map_or(0, |q| q.len());
                tracing::warn!(card = %local_id, dropped, error = %error, "card create failed");
                self.flash(format!("Save failed: {error}"));
                self.settle();
            }
            Action::MutationSaved => {
                self.saving = self.saving.saturating_sub(1);
                self.settle();
            }
            Action::MutationFailed(msg) => {
                self.saving = self.saving.saturating_sub(1);
                self.flash(format!("Save failed: {msg}"));
                self.settle();
            }
            Action::IssuesRefreshed(summary) => {
                self.flash(format!("{} ({} issues)", summary.message, summary.count));
                self.reload();
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn handle_key(&mut self, key: KeyAction) {
        match self.mode.clone() {
            Mode::Editing { card_id, buffer } => self.handle_edit_key(key, card_id, buffer),
            Mode::Moving { id, .. } => self.handle_move_key(key, &id),
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Up => self.move_up(),
            KeyAction::Down => self.move_down(),
            KeyAction::Left => self.move_horizontal(-1),
            KeyAction::Right => self.move_horizontal(1),
            KeyAction::Tab => {
                self.focus = match self.focus {
                    Focus::Grid => Focus::Issues,
                    Focus::Issues => Focus::Grid,
                };
            }
            KeyAction::Select | KeyAction::Char('e') => self.begin_edit(),
            KeyAction::Char('n') => self.new_card(),
            KeyAction::Char('d') => {
                if let Some(id) = self.selected_card_id() {
                    let mutations = self.board.delete_card(&id);
                    self.persist(mutations);
                    self.clamp_cursor();
                }
            }
            KeyAction::Char('p') => {
                if let Some(card) = self.selected_card() {
                    let (id, value) = (card.id.clone(), !card.is_high_priority);
                    let mutations = self.board.toggle_high_priority(&id, value);
                    self.persist(mutations);
                }
            }
            KeyAction::Char('m') => self.pick_up(),
            KeyAction::Char('h') => {
                if let Some(id) = self.selected_issue_id() {
                    let mutations = self.board.hide_issue(&id);
                    self.persist(mutations);
                    self.clamp_cursor();
                }
            }
            KeyAction::Char('H') => {
                self.show_hidden = !self.show_hidden;
                self.selected_issue = 0;
            }
            KeyAction::Char('u') => {
                if let Some(id) = self.selected_hidden_id() {
                    let mutations = self.board.unhide_card(&id);
                    self.persist(mutations);
                    self.clamp_cursor();
                }
            }
            KeyAction::Char('r') => self.reload(),
            KeyAction::Char('R') => self.refresh_issues(),
            KeyAction::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyAction, card_id: String, mut buffer: String) {
        match key {
            KeyAction::Char(c) => {
                buffer.push(c);
                self.mode = Mode::Editing { card_id, buffer };
            }
            KeyAction::Backspace => {
                buffer.pop();
                self.mode = Mode::Editing { card_id, buffer };
            }
            KeyAction::Select => {
                self.mode = Mode::Normal;
                let mutations = self.board.update_card_text(&card_id, &buffer);
                self.persist(mutations);
                self.clamp_cursor();
            }
            KeyAction::Escape => {
                self.mode = Mode::Normal;
                // A card left without text is discarded.
                let blank = self
                    .board
                    .card(&card_id)
                    .is_some_and(|c| c.text.trim().is_empty());
                if blank {
                    let mutations = self.board.update_card_text(&card_id, "");
                    self.persist(mutations);
                    self.clamp_cursor();
                }
            }
            _ => {
                self.mode = Mode::Editing { card_id, buffer };
            }
        }
    }

    fn handle_move_key(&mut self, key: KeyAction, id: &str) {
        match key {
            KeyAction::Up => self.move_up(),
            KeyAction::Down => self.move_down(),
            KeyAction::Left => self.move_horizontal(-1),
            KeyAction::Right => self.move_horizontal(1),
            KeyAction::Select => {
                self.mode = Mode::Normal;
                if let Some(location) = self.cursor_location() {
                    let mutations = self.board.move_card(id, location);
                    self.persist(mutations);
                    self.clamp_cursor();
                }
            }
            KeyAction::Escape => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn new_card(&mut self) {
        let Some(objective) = self.objectives.get(self.cursor_row).map(|o| o.id.clone()) else {
            return;
        };
        let column = Column::ALL[self.cursor_col];
        let (id, mutations) = self.board.place_new_card(&objective, column, "");
        self.persist(mutations);
        self.focus = Focus::Grid;
        self.cursor_slot = self.board.cards_at(&objective, column).len().saturating_sub(1);
        self.mode = Mode::Editing {
            card_id: id,
            buffer: String::new(),
        };
    }

    fn begin_edit(&mut self) {
        if let Some(card) = self.selected_card() {
            self.mode = Mode::Editing {
                card_id: card.id.clone(),
                buffer: card.text.clone(),
            };
        }
    }

    fn pick_up(&mut self) {
        let picked = match self.focus {
            Focus::Grid => self.selected_card().map(|c| (c.id.clone(), c.text.clone())),
            Focus::Issues if !self.show_hidden => self
                .selected_issue_id()
                .and_then(|id| self.board.issue(&id))
                .map(|i| (i.id.clone(), i.title.clone())),
            Focus::Issues => None,
        };
        if let Some((id, label)) = picked {
            self.focus = Focus::Grid;
            self.mode = Mode::Moving { id, label };
        }
    }

    /// Send mutations to the server, each on its own task. Mutations on a card
    /// whose create has not come back yet wait for it.
    fn persist(&mut self, mutations: Vec<Mutation>) {
        for mutation in mutations {
            self.mutation_epoch += 1;
            if let Some(queue) = self.awaiting.get_mut(mutation.card_id()) {
                queue.push(mutation);
                continue;
            }
            self.saving += 1;
            let api = self.api.clone();
            let tx = self.action_tx.clone();
            match mutation {
                Mutation::Create { card } => {
                    let local_id = card.id.clone();
                    self.awaiting.insert(local_id.clone(), Vec::new());
                    tokio::spawn(async move {
                        let action = match api.create_card(&card).await {
                            Ok(card) => Action::CardCreated { local_id, card },
                            Err(e) => Action::CardCreateFailed {
                                local_id,
                                error: format!("{e:#}"),
                            },
                        };
                        let _ = tx.send(action);
                    });
                }
                Mutation::Update { id, patch } => {
                    tokio::spawn(async move {
                        let action = match api.update_card(&id, &patch).await {
                            Ok(_) => Action::MutationSaved,
                            Err(e) => Action::MutationFailed(format!("{e:#}")),
                        };
                        let _ = tx.send(action);
                    });
                }
                Mutation::Delete { id } => {
                    tokio::spawn(async move {
                        let action = match api.delete_card(&id).await {
                            Ok(_) => Action::MutationSaved,
                            Err(e) => Action::MutationFailed(format!("{e:#}")),
                        };
                        let _ = tx.send(action);
                    });
                }
            }
        }
    }

    fn card_created(&mut self, local_id: &str, card: &Card) {
        let queued = self.awaiting.remove(local_id).unwrap_or_default();
        if card.id != local_id {
            tracing::debug!(from = %local_id, to = %card.id, queued = queued.len(), "card id assigned");
            self.board.rename_card(local_id, &card.id);
            match &mut self.mode {
                Mode::Editing { card_id: id, .. } | Mode::Moving { id, .. } if *id == local_id => {
                    *id = card.id.clone();
                }
                _ => {}
            }
        }
        let replay = queued
            .into_iter()
            .map(|m| m.with_card_id(&card.id))
            .collect();
        self.persist(replay);
    }

    /// Run a deferred reload once nothing is in flight.
    fn settle(&mut self) {
        if self.saving == 0 && self.reload_pending {
            self.reload();
        }
    }

    pub fn reload(&mut self) {
        self.spawn_fetch(Vec::new());
    }

    fn spawn_fetch(&mut self, seed: Vec<NewCardRecord>) {
        self.reload_pending = false;
        self.loading = true;
        let epoch = self.mutation_epoch;
        let api = self.api.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match fetch_board(api.as_ref(), &seed, &tx).await {
                Ok((cards, listing)) => Action::BoardLoaded {
                    epoch,
                    cards,
                    listing,
                },
                Err(e) => Action::FetchError(format!("{e:#}")),
            };
            let _ = tx.send(action);
        });
    }

    fn refresh_issues(&mut self) {
        self.loading = true;
        self.flash("Refreshing issues...".to_string());
        let api = self.api.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match api.refresh_issues().await {
                Ok(summary) => Action::IssuesRefreshed(summary),
                Err(e) => Action::FetchError(format!("{e:#}")),
            };
            let _ = tx.send(action);
        });
    }

    fn flash(&mut self, msg: String) {
        self.flash_message = Some((msg, Instant::now()));
    }

    // Cursor and selection

    pub fn cursor_location(&self) -> Option<Location> {
        let objective = self.objectives.get(self.cursor_row)?;
        Some(Location::cell(objective.id.clone(), Column::ALL[self.cursor_col]))
    }

    fn cell_len(&self, row: usize, col: usize) -> usize {
        self.objectives
            .get(row)
            .map_or(0, |o| self.board.cards_at(&o.id, Column::ALL[col]).len())
    }

    pub fn selected_card(&self) -> Option<&Card> {
        if self.focus != Focus::Grid {
            return None;
        }
        let objective = self.objectives.get(self.cursor_row)?;
        self.board
            .cards_at(&objective.id, Column::ALL[self.cursor_col])
            .get(self.cursor_slot)
            .copied()
    }

    fn selected_card_id(&self) -> Option<String> {
        self.selected_card().map(|c| c.id.clone())
    }

    fn selected_issue_id(&self) -> Option<String> {
        if self.focus != Focus::Issues || self.show_hidden {
            return None;
        }
        self.board
            .issues()
            .get(self.selected_issue)
            .map(|i| i.id.clone())
    }

    fn selected_hidden_id(&self) -> Option<String> {
        if self.focus != Focus::Issues || !self.show_hidden {
            return None;
        }
        self.board
            .hidden_cards()
            .get(self.selected_issue)
            .map(|c| c.id.clone())
    }

    /// Entries in the side pane: unplaced issues, or hidden cards.
    pub fn side_len(&self) -> usize {
        if self.show_hidden {
            self.board.hidden_cards().len()
        } else {
            self.board.issues().len()
        }
    }

    fn move_up(&mut self) {
        if self.focus == Focus::Issues {
            self.selected_issue = self.selected_issue.saturating_sub(1);
            return;
        }
        if self.cursor_slot > 0 {
            self.cursor_slot -= 1;
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_slot = self
                .cell_len(self.cursor_row, self.cursor_col)
                .saturating_sub(1);
        }
    }

    fn move_down(&mut self) {
        if self.focus == Focus::Issues {
            if self.selected_issue + 1 < self.side_len() {
                self.selected_issue += 1;
            }
            return;
        }
        if self.cursor_slot + 1 < self.cell_len(self.cursor_row, self.cursor_col) {
            self.cursor_slot += 1;
        } else if self.cursor_row + 1 < self.objectives.len() {
            self.cursor_row += 1;
            self.cursor_slot = 0;
        }
    }

    fn move_horizontal(&mut self, delta: isize) {
        if self.focus != Focus::Grid {
            return;
        }
        let col = self.cursor_col as isize + delta;
        if (0..Column::ALL.len() as isize).contains(&col) {
            self.cursor_col = col as usize;
            self.clamp_cursor();
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = self.cursor_row.min(self.objectives.len().saturating_sub(1));
        let len = self.cell_len(self.cursor_row, self.cursor_col);
        self.cursor_slot = self.cursor_slot.min(len.saturating_sub(1));
        self.selected_issue = self.selected_issue.min(self.side_len().saturating_sub(1));
    }
}

/// Load cards and issues, seeding an empty board first.
async fn fetch_board(
    api: &dyn BoardApi,
    seed: &[NewCardRecord],
    tx: &mpsc::UnboundedSender<Action>,
) -> anyhow::Result<(Vec<Card>, IssueListing)> {
    let mut cards = api.list_cards().await?;
    if cards.is_empty() && !seed.is_empty() {
        cards = api.create_batch(seed).await?;
        tracing::info!(count = cards.len(), "seeded empty board");
        let _ = tx.send(Action::Seeded(cards.len()));
    }
    let listing = api.list_issues().await?;
    Ok((cards, listing))
}

#[cfg(test)]
pub mod tests;
