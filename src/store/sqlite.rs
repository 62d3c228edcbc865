//! SQLite-backed card store and issue cache persistence.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{CardStore, IssueStore};
use crate::error::{BoardError, Result};
use crate::model::card::{Card, CardPatch, Location};
use crate::model::issue::Issue;
use crate::model::record::CardRecord;

const ISSUES_REFRESHED_KEY: &str = "issues_refreshed_at";

const CARD_COLUMNS: &str =
    "id, text, location, is_accent, is_high_priority, github_number, github_url";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// SQLite integers are signed; issue numbers past `i64::MAX` cannot be stored.
fn issue_number_column(number: u64) -> Result<i64> {
    i64::try_from(number)
        .map_err(|_| BoardError::Validation(format!("issue number {number} is out of range")))
}

/// A `roadmap_cards` row before its JSON location is parsed.
struct CardRow {
    id: String,
    text: String,
    location: String,
    is_accent: bool,
    is_high_priority: bool,
    github_number: Option<i64>,
    github_url: Option<String>,
}

impl CardRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(CardRow {
            id: row.get(0)?,
            text: row.get(1)?,
            location: row.get(2)?,
            is_accent: row.get(3)?,
            is_high_priority: row.get(4)?,
            github_number: row.get(5)?,
            github_url: row.get(6)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        let location: Location = serde_json::from_str(&self.location)?;
        let github_number = self
            .github_number
            .map(|n| {
                u64::try_from(n).map_err(|_| {
                    BoardError::Internal(format!("card {} has negative issue number {n}", self.id))
                })
            })
            .transpose()?;
        Ok(CardRecord {
            id: self.id,
            text: self.text,
            location,
            is_accent: self.is_accent,
            is_high_priority: self.is_high_priority,
            github_number,
            github_url: self.github_url,
        }
        .into())
    }
}

impl SqliteStore {
    /// Open or create the database file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BoardError::Internal(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS roadmap_cards (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                location TEXT NOT NULL,
                is_accent INTEGER NOT NULL DEFAULT 0,
                is_high_priority INTEGER NOT NULL DEFAULT 0,
                github_number INTEGER,
                github_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_roadmap_cards_github_number
                ON roadmap_cards(github_number);

            CREATE TABLE IF NOT EXISTS github_issues (
                id TEXT PRIMARY KEY,
                number INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                labels TEXT NOT NULL DEFAULT '[]',
                fetched_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BoardError::Internal("card store lock poisoned".into()))
    }

    fn query_card<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<Card>> {
        let row = conn.query_row(sql, params, CardRow::from_row).optional()?;
        row.map(CardRow::into_card).transpose()
    }

    fn write_card(conn: &Connection, card: &Card) -> Result<()> {
        let record = CardRecord::from(card.clone());
        let github_number = record.github_number.map(issue_number_column).transpose()?;
        conn.execute(
            r#"
            UPDATE roadmap_cards
            SET text = ?2, location = ?3, is_accent = ?4, is_high_priority = ?5,
                github_number = ?6, github_url = ?7
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.text,
                serde_json::to_string(&record.location)?,
                record.is_accent,
                record.is_high_priority,
                github_number,
                record.github_url,
            ],
        )?;
        Ok(())
    }
}

impl CardStore for SqliteStore {
    fn list_cards(&self) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM roadmap_cards ORDER BY rowid"
        ))?;
        let rows = stmt
            .query_map([], CardRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let conn = self.conn()?;
        Self::query_card(
            &conn,
            &format!("SELECT {CARD_COLUMNS} FROM roadmap_cards WHERE id = ?1"),
            [id],
        )
    }

    fn find_by_issue_number(&self, number: u64) -> Result<Option<Card>> {
        let Ok(number) = i64::try_from(number) else {
            return Ok(None);
        };
        let conn = self.conn()?;
        Self::query_card(
            &conn,
            &format!(
                "SELECT {CARD_COLUMNS} FROM roadmap_cards WHERE github_number = ?1 ORDER BY rowid LIMIT 1"
            ),
            [number],
        )
    }

    fn create_card(&self, card: &Card) -> Result<()> {
        let record = CardRecord::from(card.clone());
        let github_number = record.github_number.map(issue_number_column).transpose()?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            &format!("INSERT INTO roadmap_cards ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                record.id,
                record.text,
                serde_json::to_string(&record.location)?,
                record.is_accent,
                record.is_high_priority,
                github_number,
                record.github_url,
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(BoardError::DuplicateCard(card.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Option<Card>> {
        let conn = self.conn()?;
        let Some(mut card) = Self::query_card(
            &conn,
            &format!("SELECT {CARD_COLUMNS} FROM roadmap_cards WHERE id = ?1"),
            [id],
        )?
        else {
            return Ok(None);
        };
        patch.apply(&mut card);
        Self::write_card(&conn, &card)?;
        Ok(Some(card))
    }

    fn delete_card(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM roadmap_cards WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

impl IssueStore for SqliteStore {
    fn replace_issues(&self, issues: &[Issue], fetched_at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;
        let stamp = fetched_at.to_rfc3339();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM github_issues", [])?;
        for issue in issues {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO github_issues (id, number, title, url, labels, fetched_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    issue.id,
                    issue_number_column(issue.number)?,
                    issue.title,
                    issue.url,
                    serde_json::to_string(&issue.labels)?,
                    stamp,
                ],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?1, ?2)",
            params![ISSUES_REFRESHED_KEY, stamp],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, number, title, url, labels FROM github_issues ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, number, title, url, labels)| {
                let number = u64::try_from(number).map_err(|_| {
                    BoardError::Internal(format!("issue {id} has negative number {number}"))
                })?;
                Ok(Issue {
                    id,
                    number,
                    title,
                    url,
                    labels: serde_json::from_str(&labels)?,
                })
            })
            .collect()
    }

    fn last_refreshed(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?1",
                [ISSUES_REFRESHED_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| BoardError::Internal(format!("bad refresh timestamp '{v}': {e}")))
            })
            .transpose()
    }
}
