use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::card::{Column, Location, HIDDEN_SENTINEL};
use crate::model::objective::{default_objectives, Objective};
use crate::model::record::NewCardRecord;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    pub github: Option<GitHubConfig>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub seed: Vec<SeedCard>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub token: Option<String>,
    /// GraphQL endpoint, for GitHub Enterprise.
    pub api_url: Option<String>,
}

impl GitHubConfig {
    /// The configured token, else `GITHUB_TOKEN` from the environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    }
}

/// A card posted on first run when the board is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCard {
    pub text: String,
    pub objective: String,
    pub column: Column,
    #[serde(default)]
    pub is_accent: bool,
}

impl SeedCard {
    pub fn to_record(&self) -> NewCardRecord {
        NewCardRecord {
            id: None,
            text: self.text.clone(),
            location: Location::cell(self.objective.clone(), self.column),
            is_accent: self.is_accent,
            is_high_priority: false,
            github_number: None,
            github_url: None,
        }
    }
}

impl AppConfig {
    pub fn objectives(&self) -> Vec<Objective> {
        if self.objectives.is_empty() {
            default_objectives()
        } else {
            self.objectives.clone()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.server
            .database
            .clone()
            .unwrap_or_else(|| data_dir().join("roadmap.db"))
    }
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".roadmap")
}

pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig =
        toml::from_str(contents).with_context(|| "Failed to parse config.toml")?;
    if config.objectives.iter().any(|o| o.id == HIDDEN_SENTINEL) {
        bail!("Objective id '{HIDDEN_SENTINEL}' is reserved for hidden cards");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.client.api_url, "http://127.0.0.1:5000");
        assert!(config.github.is_none());
        assert_eq!(config.objectives().len(), 5);
        assert!(config.seed.is_empty());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn full_config_parses() {
        let toml = r#"
[server]
port = 8080
database = "/tmp/board.db"

[client]
api_url = "http://board.local:8080"

[github]
owner = "octo"
repo = "roadmap"
labels = ["team-1", "2025"]
token = "ghp_x"

[[objectives]]
id = "growth"
label = "Grow <strong>fast</strong>"

[[seed]]
text = "Kickoff"
objective = "growth"
column = "now"
is_accent = true
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/board.db"));
        assert_eq!(config.client.api_url, "http://board.local:8080");

        let gh = config.github.as_ref().unwrap();
        assert_eq!(gh.labels, vec!["team-1", "2025"]);
        assert_eq!(gh.resolve_token().as_deref(), Some("ghp_x"));

        let objectives = config.objectives();
        assert_eq!(objectives.len(), 1);
        assert_eq!(objectives[0].plain_label(), "Grow fast");

        let record = config.seed[0].to_record();
        assert_eq!(record.location, Location::cell("growth", Column::Now));
        assert!(record.is_accent);
        assert!(record.id.is_none());
    }

    #[test]
    fn reserved_objective_id_is_rejected() {
        let toml = r#"
[[objectives]]
id = "hidden"
label = "Secret work"
"#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn unknown_seed_column_is_rejected() {
        let toml = r#"
[[seed]]
text = "x"
objective = "obj1"
column = "someday"
"#;
        assert!(parse_config(toml).is_err());
    }
}
