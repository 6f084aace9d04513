use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::Season;
use crate::api::RemoteData;
use crate::games::{append_records, records_table};
use crate::wide_table::{WideTable, WideTableAssembler};

pub const TEAMS_FILE: &str = "teams.csv";

pub fn teams_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(TEAMS_FILE)
}

pub fn ensure_teams_table(
    source: &dyn RemoteData,
    cache_dir: &Path,
    season: Season,
    refresh: bool,
) -> Result<WideTable> {
    let path = teams_path(cache_dir);
    if !refresh && path.is_file() {
        return WideTable::read_csv_file(&path).context("load cached teams");
    }
    let teams = source
        .teams(season)
        .with_context(|| format!("fetch teams for season {season}"))?;
    let table = records_table(&teams);
    table.write_csv_file(&path)?;
    info!(season, teams = table.row_count(), "teams fetched");
    Ok(table)
}

pub fn build_recruiting_table(source: &dyn RemoteData, seasons: &[Season]) -> Result<WideTable> {
    let mut assembler = WideTableAssembler::new();
    for season in seasons {
        let rows = source
            .recruiting(*season)
            .with_context(|| format!("fetch recruiting for season {season}"))?;
        append_records(&mut assembler, &rows);
    }
    let table = assembler.finish();
    info!(rows = table.row_count(), "recruiting table built");
    Ok(table)
}
