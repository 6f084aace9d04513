use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::info;

use crate::api::RemoteData;
use crate::config::Settings;
use crate::efficiency::{EfficiencyNormalizer, NormalizeReport};
use crate::games::build_games_table;
use crate::season_cache::SeasonCache;
use crate::stats_fetch::{PaginatedStatsFetcher, StatsSummary, merge_cached};
use crate::teams::{build_recruiting_table, ensure_teams_table};
use crate::wide_table::WideTable;

pub const GAMES_FILE: &str = "games.csv";
pub const STATS_FILE: &str = "game_stats.csv";
pub const RECRUITING_FILE: &str = "recruiting.csv";

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub seasons: usize,
    pub seasons_replaced: usize,
    pub teams: Option<usize>,
    pub games_rows: Option<usize>,
    pub stats: StatsSummary,
    pub stats_columns: usize,
    pub recruiting_rows: Option<usize>,
    pub normalize: NormalizeReport,
    pub outputs: Vec<PathBuf>,
}

/// With `settings.offline` only the stats table is rebuilt, from cached
/// seasons, and `source` is never called.
pub fn run(settings: &Settings, source: &dyn RemoteData) -> Result<RunSummary> {
    let started_at = Utc::now().to_rfc3339();
    if settings.seasons.is_empty() {
        return Err(anyhow!("no seasons selected"));
    }
    fs::create_dir_all(&settings.out_dir)
        .with_context(|| format!("create output dir {}", settings.out_dir.display()))?;
    let cache = SeasonCache::open(&settings.cache_dir)?;

    // Forced refresh overwrites selected seasons one by one as each fetch
    // succeeds. Other seasons in the cache are left alone.
    let refresh = settings.clear_cache && !settings.offline;
    let mut seasons_replaced = 0;
    if refresh {
        seasons_replaced = settings.seasons.iter().filter(|s| cache.has(**s)).count();
        info!(seasons_replaced, "refreshing cached seasons");
    }
    let mut outputs = Vec::new();

    let mut teams = None;
    let mut games_rows = None;
    let mut recruiting_rows = None;
    let (mut stats, stats_summary) = if settings.offline {
        let table = merge_cached(&cache, &settings.seasons)?;
        let summary = StatsSummary {
            seasons_cached: settings.seasons.len(),
            rows: table.row_count(),
            ..StatsSummary::default()
        };
        (table, summary)
    } else {
        // Team ids as of the latest selected season.
        let latest = settings.seasons[settings.seasons.len() - 1];
        teams = Some(ensure_teams_table(source, &settings.cache_dir, latest, refresh)?.row_count());

        let games = build_games_table(source, &settings.cache_dir, &settings.seasons, refresh)?;
        games_rows = Some(games.row_count());
        outputs.push(write_output(settings, GAMES_FILE, &games)?);

        PaginatedStatsFetcher::new(source, &cache)
            .with_max_weeks(settings.max_weeks)
            .fetch_all(&settings.seasons, refresh)?
    };

    let normalize = EfficiencyNormalizer::new(settings.legacy_patch).normalize(&mut stats);
    info!(
        converted = normalize.converted,
        unrecognized = normalize.unrecognized,
        patched = normalize.patched,
        "efficiency columns normalized"
    );
    outputs.push(write_output(settings, STATS_FILE, &stats)?);

    if !settings.offline {
        let recruiting = build_recruiting_table(source, &settings.seasons)?;
        recruiting_rows = Some(recruiting.row_count());
        outputs.push(write_output(settings, RECRUITING_FILE, &recruiting)?);
    }

    Ok(RunSummary {
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        seasons: settings.seasons.len(),
        seasons_replaced,
        teams,
        games_rows,
        stats_columns: stats.column_count(),
        stats: stats_summary,
        recruiting_rows,
        normalize,
        outputs,
    })
}

fn write_output(settings: &Settings, name: &str, table: &WideTable) -> Result<PathBuf> {
    let path = settings.out_dir.join(name);
    table.write_csv_file(&path)?;
    info!(path = %path.display(), rows = table.row_count(), "output written");
    Ok(path)
}
