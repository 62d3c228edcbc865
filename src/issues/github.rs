use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::IssueSource;
use crate::model::card::issue_card_id;
use crate::model::issue::Issue;

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

pub struct GitHubIssueSource {
    owner: String,
    repo: String,
    labels: Vec<String>,
    token: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl GitHubIssueSource {
    pub fn new(owner: String, repo: String, labels: Vec<String>, token: Option<String>) -> Self {
        Self {
            owner,
            repo,
            labels,
            token,
            api_url: GITHUB_GRAPHQL_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Search string selecting open issues carrying every required label.
    pub fn search_query(&self) -> String {
        let mut query = format!("repo:{}/{} is:issue is:open", self.owner, self.repo);
        for label in &self.labels {
            query.push_str(&format!(" label:\"{label}\""));
        }
        query
    }
}

const QUERY: &str = r#"query RoadmapIssues($cursor: String, $searchQuery: String!) {
  search(type: ISSUE, first: 100, after: $cursor, query: $searchQuery) {
    edges {
      node {
        ... on Issue {
          number title url
          labels(first: 10) { nodes { name } }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

#[derive(Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct GqlData {
    search: SearchConnection,
}

#[derive(Deserialize)]
struct SearchConnection {
    #[serde(default)]
    edges: Vec<SearchEdge>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct SearchEdge {
    node: Option<IssueNode>,
}

/// Non-issue search hits (pull requests, discussions) come back as `{}`.
#[derive(Deserialize)]
struct IssueNode {
    number: Option<u64>,
    title: Option<String>,
    url: Option<String>,
    labels: Option<LabelConnection>,
}

#[derive(Deserialize)]
struct LabelConnection {
    nodes: Vec<Label>,
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

#[derive(Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

/// One page of results plus the cursor for the next page, if there is one.
fn parse_page(resp: GqlResponse) -> Result<(Vec<Issue>, Option<String>)> {
    if let Some(first) = resp.errors.first() {
        bail!("GitHub API returned errors: {}", first.message);
    }
    let search = resp.data.context("No data in GitHub response")?.search;

    let issues = search
        .edges
        .into_iter()
        .filter_map(|edge| edge.node)
        .filter_map(|node| {
            let number = node.number?;
            Some(Issue {
                id: issue_card_id(number),
                number,
                title: node.title.unwrap_or_default(),
                url: node.url.unwrap_or_default(),
                labels: node
                    .labels
                    .map(|lc| lc.nodes.into_iter().map(|l| l.name).collect())
                    .unwrap_or_default(),
            })
        })
        .collect();

    let next = if search.page_info.has_next_page {
        search.page_info.end_cursor
    } else {
        None
    };
    Ok((issues, next))
}

#[async_trait]
impl IssueSource for GitHubIssueSource {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn fetch_issues(&self) -> Result<Vec<Issue>> {
        let Some(token) = &self.token else {
            bail!("GitHub token not configured");
        };
        let search_query = self.search_query();
        tracing::debug!(query = %search_query, "searching GitHub issues");

        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = serde_json::json!({
                "query": QUERY,
                "variables": { "cursor": cursor, "searchQuery": search_query },
            });
            let resp = self
                .client
                .post(&self.api_url)
                .bearer_auth(token)
                .header("User-Agent", "roadmap")
                .json(&body)
                .send()
                .await
                .context("GitHub API request failed")?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                bail!("GitHub API returned {status}: {text}");
            }

            let gql: GqlResponse = resp
                .json()
                .await
                .context("Failed to parse GitHub response")?;
            let (page, next) = parse_page(gql)?;
            tracing::debug!(count = page.len(), more = next.is_some(), "received issue page");
            all.extend(page);

            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        tracing::info!(count = all.len(), "fetched GitHub issues");
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(labels: &[&str]) -> GitHubIssueSource {
        GitHubIssueSource::new(
            "octo".into(),
            "roadmap".into(),
            labels.iter().map(|l| l.to_string()).collect(),
            None,
        )
    }

    fn page(json: serde_json::Value) -> GqlResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn search_query_requires_every_label() {
        let q = source(&["team-1", "2025"]).search_query();
        assert_eq!(
            q,
            r#"repo:octo/roadmap is:issue is:open label:"team-1" label:"2025""#
        );
    }

    #[test]
    fn parse_page_maps_issues_and_skips_other_nodes() {
        let resp = page(serde_json::json!({
            "data": { "search": {
                "edges": [
                    { "node": { "number": 7, "title": "Fix", "url": "http://x/7",
                                "labels": { "nodes": [{ "name": "team-1" }] } } },
                    { "node": {} },
                    { "node": null }
                ],
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" }
            }}
        }));
        let (issues, next) = parse_page(resp).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "github-7");
        assert_eq!(issues[0].labels, vec!["team-1".to_string()]);
        assert_eq!(next.as_deref(), Some("abc"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let resp = page(serde_json::json!({
            "data": { "search": {
                "edges": [],
                "pageInfo": { "hasNextPage": false, "endCursor": "zzz" }
            }}
        }));
        let (issues, next) = parse_page(resp).unwrap();
        assert!(issues.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn more_pages_without_cursor_stops() {
        let resp = page(serde_json::json!({
            "data": { "search": {
                "edges": [],
                "pageInfo": { "hasNextPage": true, "endCursor": null }
            }}
        }));
        let (_, next) = parse_page(resp).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn graphql_errors_fail_the_page() {
        let resp = page(serde_json::json!({
            "data": null,
            "errors": [{ "message": "Bad credentials" }]
        }));
        let err = parse_page(resp).unwrap_err();
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn missing_token_fails_without_network() {
        let err = source(&[]).fetch_issues().await.unwrap_err();
        assert!(err.to_string().contains("token"));
    }
}
