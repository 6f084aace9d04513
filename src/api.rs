use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::Season;
use crate::http_client::http_client;
use crate::stats_fetch::{GameStatEntry, parse_team_game_stats_json};

pub const CFBD_BASE_URL: &str = "https://api.collegefootballdata.com";

pub trait RemoteData {
    fn games(&self, season: Season) -> Result<Vec<Value>>;

    /// Per-team statistics for every game of one week. An empty vec means
    /// the season has no such week.
    fn team_game_stats(&self, season: Season, week: u32) -> Result<Vec<GameStatEntry>>;

    fn teams(&self, season: Season) -> Result<Vec<Value>>;

    fn recruiting(&self, season: Season) -> Result<Vec<Value>>;
}

pub struct CfbdClient {
    client: &'static Client,
    base_url: String,
    api_key: String,
    season_type: String,
    conference: Option<String>,
}

impl CfbdClient {
    pub fn new(
        api_key: impl Into<String>,
        season_type: impl Into<String>,
        conference: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow!("empty api key"));
        }
        Ok(Self {
            client: http_client()?,
            base_url: CFBD_BASE_URL.to_string(),
            api_key,
            season_type: season_type.into(),
            conference: conference.filter(|c| !c.trim().is_empty()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn scoped_query(&self, season: Season) -> String {
        let mut query = format!("year={season}&seasonType={}", self.season_type);
        if let Some(conference) = self.conference.as_deref() {
            query.push_str("&conference=");
            query.push_str(conference);
        }
        query
    }

    fn get_body(&self, path_and_query: &str) -> Result<String> {
        let url = format!("{}{path_and_query}", self.base_url);
        debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}: {body}"));
        }
        Ok(body)
    }

    fn get_array(&self, path_and_query: &str) -> Result<Vec<Value>> {
        let body = self.get_body(path_and_query)?;
        parse_json_array(&body).with_context(|| format!("invalid json from {path_and_query}"))
    }
}

impl RemoteData for CfbdClient {
    fn games(&self, season: Season) -> Result<Vec<Value>> {
        self.get_array(&format!("/games?{}", self.scoped_query(season)))
    }

    fn team_game_stats(&self, season: Season, week: u32) -> Result<Vec<GameStatEntry>> {
        let path = format!("/games/teams?{}&week={week}", self.scoped_query(season));
        let body = self.get_body(&path)?;
        parse_team_game_stats_json(&body)
            .with_context(|| format!("invalid team stats json for {season} week {week}"))
    }

    fn teams(&self, season: Season) -> Result<Vec<Value>> {
        self.get_array(&format!("/teams?year={season}"))
    }

    fn recruiting(&self, season: Season) -> Result<Vec<Value>> {
        self.get_array(&format!("/recruiting/teams?year={season}"))
    }
}

/// Stand-in source for cache-only runs. Every call fails.
pub struct Offline;

impl RemoteData for Offline {
    fn games(&self, season: Season) -> Result<Vec<Value>> {
        Err(anyhow!("offline: games for {season} not available"))
    }

    fn team_game_stats(&self, season: Season, week: u32) -> Result<Vec<GameStatEntry>> {
        Err(anyhow!("offline: team stats for {season} week {week} not available"))
    }

    fn teams(&self, season: Season) -> Result<Vec<Value>> {
        Err(anyhow!("offline: teams for {season} not available"))
    }

    fn recruiting(&self, season: Season) -> Result<Vec<Value>> {
        Err(anyhow!("offline: recruiting for {season} not available"))
    }
}

pub fn parse_json_array(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(trimmed).context("invalid json")? {
        Value::Array(items) => Ok(items),
        other => Err(anyhow!("expected json array, got {}", json_kind(&other))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
