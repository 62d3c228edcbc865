use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::client::{BoardApi, HttpBoardApi};
use crate::config::AppConfig;
use crate::issues::{create_source, IssueCache};
use crate::model::record::NewCardRecord;
use crate::store::SqliteStore;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API, optionally overriding the configured port.
    Serve { port: Option<u16> },
    /// Open the terminal board.
    Board,
    /// Pull issues from the tracker into the local cache.
    Refresh,
    /// Post cards from a JSON file to `/cards/batch`.
    Seed { file: PathBuf },
    Help,
}

/// Parse arguments after the program name. No arguments opens the board.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Board);
    };
    let rest = &args[1..];

    match command.as_str() {
        "serve" => Ok(Command::Serve {
            port: parse_port(rest)?,
        }),
        "board" => Ok(Command::Board),
        "refresh" => Ok(Command::Refresh),
        "seed" => match rest {
            [file] => Ok(Command::Seed {
                file: PathBuf::from(file),
            }),
            [] => bail!("Usage: roadmap seed <cards.json>"),
            _ => bail!("seed takes exactly one file"),
        },
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => bail!("Unknown command '{other}'. Run `roadmap help` for usage."),
    }
}

fn parse_port(args: &[String]) -> Result<Option<u16>> {
    let mut port = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-p" | "--port" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for --port flag");
                };
                let parsed = value
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port '{value}'"))?;
                port = Some(parsed);
            }
            other => bail!("Unknown option '{other}' for serve"),
        }
        i += 1;
    }
    Ok(port)
}

/// Refresh the issue cache in place, without a running server.
pub async fn handle_refresh(config: &AppConfig) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&config.database_path())?);
    let Some(source) = create_source(config) else {
        bail!("No issue tracker configured. Add a [github] section to ~/.roadmap/config.toml");
    };
    let cache = IssueCache::new(store, Some(source))?;
    let outcome = cache.refresh().await?;
    if outcome.from_cache {
        bail!(
            "Tracker unavailable; {} cached issues kept (see log for details)",
            outcome.count
        );
    }
    println!("Refreshed {} issues", outcome.count);
    Ok(())
}

pub async fn handle_seed(config: &AppConfig, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let cards = parse_seed(&contents)?;

    let api = HttpBoardApi::new(&config.client.api_url);
    let created = api.create_batch(&cards).await?;
    println!("Seeded {} cards", created.len());
    Ok(())
}

fn parse_seed(contents: &str) -> Result<Vec<NewCardRecord>> {
    let cards: Vec<NewCardRecord> =
        serde_json::from_str(contents).context("Seed file must be a JSON array of cards")?;
    if cards.is_empty() {
        bail!("Seed file contains no cards");
    }
    Ok(cards)
}

pub fn print_help() {
    println!("roadmap: objectives by now/next/later planning board\n");
    println!("USAGE:");
    println!("  roadmap                    Open the terminal board");
    println!("  roadmap serve [--port N]   Run the HTTP API (default port 5000)");
    println!("  roadmap refresh            Pull issues from GitHub into the cache");
    println!("  roadmap seed <cards.json>  Post cards to a running server");
    println!("  roadmap help               Show this message");
    println!();
    println!("CONFIG: ~/.roadmap/config.toml");
    println!("  [server] host, port, database");
    println!("  [client] api_url");
    println!("  [github] owner, repo, labels, token (or GITHUB_TOKEN)");
    println!("  [[objectives]] id, label");
    println!("  [[seed]] text, objective, column, is_accent");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_opens_board() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Command::Board);
    }

    #[test]
    fn serve_without_port() {
        assert_eq!(
            parse_args(&args(&["serve"])).unwrap(),
            Command::Serve { port: None }
        );
    }

    #[test]
    fn serve_with_port() {
        assert_eq!(
            parse_args(&args(&["serve", "--port", "8080"])).unwrap(),
            Command::Serve { port: Some(8080) }
        );
        assert_eq!(
            parse_args(&args(&["serve", "-p", "9000"])).unwrap(),
            Command::Serve { port: Some(9000) }
        );
    }

    #[test]
    fn serve_missing_port_value_fails() {
        let err = parse_args(&args(&["serve", "--port"])).unwrap_err();
        assert!(err.to_string().contains("Missing value"));
    }

    #[test]
    fn serve_bad_port_fails() {
        let err = parse_args(&args(&["serve", "--port", "99999"])).unwrap_err();
        assert!(err.to_string().contains("Invalid port"));
    }

    #[test]
    fn seed_requires_one_file() {
        assert_eq!(
            parse_args(&args(&["seed", "cards.json"])).unwrap(),
            Command::Seed {
                file: PathBuf::from("cards.json")
            }
        );
        assert!(parse_args(&args(&["seed"])).is_err());
        assert!(parse_args(&args(&["seed", "a.json", "b.json"])).is_err());
    }

    #[test]
    fn help_aliases() {
        for flag in ["help", "-h", "--help"] {
            assert_eq!(parse_args(&args(&[flag])).unwrap(), Command::Help);
        }
    }

    #[test]
    fn unknown_command_fails() {
        let err = parse_args(&args(&["deploy"])).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn seed_file_accepts_client_ids() {
        let json = r#"[
            {"id": "card-1", "text": "Kickoff", "location": {"objective": "obj1", "column": "now"}},
            {"text": "Later", "location": {"objective": "obj2", "column": "later"}, "is_accent": true}
        ]"#;
        let cards = parse_seed(json).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id.as_deref(), Some("card-1"));
        assert!(cards[1].is_accent);
    }

    #[test]
    fn empty_seed_file_fails() {
        assert!(parse_seed("[]").is_err());
        assert!(parse_seed("{}").is_err());
    }
}
