use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::Season;
use crate::api::{RemoteData, parse_json_array};
use crate::wide_table::{Cell, WideTable, WideTableAssembler};

pub fn raw_games_path(cache_dir: &Path, season: Season) -> PathBuf {
    cache_dir.join(format!("games_{season}.json"))
}

pub fn build_games_table(
    source: &dyn RemoteData,
    cache_dir: &Path,
    seasons: &[Season],
    refresh: bool,
) -> Result<WideTable> {
    let mut assembler = WideTableAssembler::new();
    for season in seasons {
        let games = load_or_fetch_games(source, cache_dir, *season, refresh)?;
        append_records(&mut assembler, &games);
    }
    let table = assembler.finish();
    info!(rows = table.row_count(), columns = table.column_count(), "games table built");
    Ok(table)
}

fn load_or_fetch_games(
    source: &dyn RemoteData,
    cache_dir: &Path,
    season: Season,
    refresh: bool,
) -> Result<Vec<Value>> {
    let path = raw_games_path(cache_dir, season);
    if !refresh && path.is_file() {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        return parse_json_array(&raw).with_context(|| format!("parse {}", path.display()));
    }
    let games = source
        .games(season)
        .with_context(|| format!("fetch games for season {season}"))?;
    fs::create_dir_all(cache_dir).with_context(|| format!("create {}", cache_dir.display()))?;
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(&games).context("serialize games")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
    info!(season, games = games.len(), "games fetched");
    Ok(games)
}

pub fn records_table(records: &[Value]) -> WideTable {
    let mut assembler = WideTableAssembler::new();
    append_records(&mut assembler, records);
    assembler.finish()
}

pub fn append_records(assembler: &mut WideTableAssembler, records: &[Value]) {
    for record in records {
        let Some(obj) = record.as_object() else {
            continue;
        };
        assembler.add_record(obj.iter().map(|(k, v)| (k.clone(), value_cell(v))));
    }
}

pub fn value_cell(v: &Value) -> Cell {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}
