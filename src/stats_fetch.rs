use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::Season;
use crate::api::RemoteData;
use crate::season_cache::SeasonCache;
use crate::wide_table::{Cell, WideTable, WideTableAssembler};

pub const DEFAULT_MAX_WEEKS: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct GameStatEntry {
    #[serde(deserialize_with = "text_required")]
    pub id: String,
    #[serde(default)]
    pub teams: Vec<TeamStatBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamStatBlock {
    #[serde(rename = "homeAway")]
    pub home_away: String,
    #[serde(default)]
    pub stats: Vec<TeamStat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamStat {
    pub category: String,
    #[serde(default, deserialize_with = "text_optional")]
    pub stat: Option<String>,
}

impl TeamStatBlock {
    pub fn is_home(&self) -> bool {
        self.home_away.trim().eq_ignore_ascii_case("home")
    }

    pub fn is_away(&self) -> bool {
        self.home_away.trim().eq_ignore_ascii_case("away")
    }

    pub fn stat_pairs(&self) -> impl Iterator<Item = (&str, Cell)> {
        self.stats
            .iter()
            .map(|s| (s.category.as_str(), s.stat.clone()))
    }
}

impl GameStatEntry {
    pub fn home_away(&self) -> Result<(&TeamStatBlock, &TeamStatBlock)> {
        if self.teams.len() != 2 {
            bail!("game {} has {} team blocks", self.id, self.teams.len());
        }
        let home = self.teams.iter().find(|t| t.is_home());
        let away = self.teams.iter().find(|t| t.is_away());
        match (home, away) {
            (Some(home), Some(away)) => Ok((home, away)),
            _ => Err(anyhow!(
                "game {} lacks one home and one away team ({:?})",
                self.id,
                self.teams.iter().map(|t| t.home_away.as_str()).collect::<Vec<_>>()
            )),
        }
    }
}

pub fn parse_team_game_stats_json(raw: &str) -> Result<Vec<GameStatEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid team game stats json")
}

fn text_required<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn text_optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonSource {
    Cache,
    Remote { weeks: u32, requests: u32 },
}

#[derive(Debug, Clone)]
pub struct SeasonStats {
    pub season: Season,
    pub source: SeasonSource,
    pub table: WideTable,
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub seasons_cached: usize,
    pub seasons_fetched: usize,
    pub requests: u32,
    pub rows: usize,
}

pub struct PaginatedStatsFetcher<'a> {
    source: &'a dyn RemoteData,
    cache: &'a SeasonCache,
    max_weeks: u32,
}

impl<'a> PaginatedStatsFetcher<'a> {
    pub fn new(source: &'a dyn RemoteData, cache: &'a SeasonCache) -> Self {
        Self {
            source,
            cache,
            max_weeks: DEFAULT_MAX_WEEKS,
        }
    }

    pub fn with_max_weeks(mut self, max_weeks: u32) -> Self {
        self.max_weeks = max_weeks.max(1);
        self
    }

    /// Pages from week 1 until a week comes back empty. A failed request is
    /// an error, never an end-of-season signal.
    pub fn fetch_season(&self, season: Season, refresh: bool) -> Result<SeasonStats> {
        if !refresh && self.cache.has(season) {
            let table = self.cache.load(season)?;
            info!(season, rows = table.row_count(), "season stats from cache");
            return Ok(SeasonStats {
                season,
                source: SeasonSource::Cache,
                table,
            });
        }

        let mut assembler = WideTableAssembler::new();
        let mut week = 1u32;
        let mut requests = 0u32;
        loop {
            if week > self.max_weeks {
                warn!(season, max_weeks = self.max_weeks, "week ceiling reached");
                break;
            }
            let page = self
                .source
                .team_game_stats(season, week)
                .with_context(|| format!("fetch team stats season {season} week {week}"))?;
            requests += 1;
            if page.is_empty() {
                debug!(season, week, "empty week, season complete");
                break;
            }
            for entry in &page {
                let (home, away) = entry
                    .home_away()
                    .with_context(|| format!("season {season} week {week}"))?;
                assembler.add_game(&entry.id, home.stat_pairs(), away.stat_pairs());
            }
            debug!(season, week, games = page.len(), rows = assembler.row_count(), "week assembled");
            week += 1;
        }

        let table = assembler.finish();
        self.cache.store(season, &table)?;
        info!(
            season,
            rows = table.row_count(),
            columns = table.column_count(),
            requests,
            "season stats fetched"
        );
        Ok(SeasonStats {
            season,
            source: SeasonSource::Remote {
                weeks: week - 1,
                requests,
            },
            table,
        })
    }

    pub fn fetch_all(&self, seasons: &[Season], refresh: bool) -> Result<(WideTable, StatsSummary)> {
        let mut summary = StatsSummary::default();
        let mut tables = Vec::with_capacity(seasons.len());
        for season in seasons {
            let stats = self.fetch_season(*season, refresh)?;
            match stats.source {
                SeasonSource::Cache => summary.seasons_cached += 1,
                SeasonSource::Remote { requests, .. } => {
                    summary.seasons_fetched += 1;
                    summary.requests += requests;
                }
            }
            tables.push(stats.table);
        }
        let merged = WideTable::concat(tables);
        summary.rows = merged.row_count();
        Ok((merged, summary))
    }
}

pub fn merge_cached(cache: &SeasonCache, seasons: &[Season]) -> Result<WideTable> {
    let mut tables = Vec::with_capacity(seasons.len());
    for season in seasons {
        tables.push(cache.load(*season)?);
    }
    Ok(WideTable::concat(tables))
}
