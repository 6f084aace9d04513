use std::cell::Cell as Counter;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use cfb_dataset::Season;
use cfb_dataset::api::{Offline, RemoteData};
use cfb_dataset::config::Settings;
use cfb_dataset::pipeline::{self, GAMES_FILE, RECRUITING_FILE, STATS_FILE};
use cfb_dataset::season_cache::SeasonCache;
use cfb_dataset::stats_fetch::{GameStatEntry, parse_team_game_stats_json};
use cfb_dataset::wide_table::WideTable;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn scratch_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let dir = std::env::temp_dir().join(format!(
        "cfb_dataset_{name}_{}_{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

/// One season of data: week 1 from the fixture, nothing after.
#[derive(Default)]
struct OneSeason {
    stat_requests: Counter<u32>,
    team_requests: Counter<u32>,
    stats_down: Counter<bool>,
}

impl RemoteData for OneSeason {
    fn games(&self, season: Season) -> Result<Vec<Value>> {
        Ok(vec![
            json!({"id": 332412, "season": season, "week": 1, "home_team": "Iowa", "away_team": "Nevada"}),
            json!({"id": 332413, "season": season, "week": 1, "home_team": "Kansas State", "away_team": "Michigan", "neutral_site": false}),
        ])
    }

    fn team_game_stats(&self, _season: Season, week: u32) -> Result<Vec<GameStatEntry>> {
        self.stat_requests.set(self.stat_requests.get() + 1);
        if self.stats_down.get() {
            return Err(anyhow!("http 503 Service Unavailable"));
        }
        if week == 1 {
            return parse_team_game_stats_json(&read_fixture("team_stats_week1.json"));
        }
        Ok(Vec::new())
    }

    fn teams(&self, _season: Season) -> Result<Vec<Value>> {
        self.team_requests.set(self.team_requests.get() + 1);
        Ok(vec![
            json!({"id": 2294, "school": "Iowa", "conference": "Big Ten"}),
            json!({"id": 130, "school": "Michigan", "conference": "Big Ten"}),
        ])
    }

    fn recruiting(&self, season: Season) -> Result<Vec<Value>> {
        Ok(vec![json!({"year": season, "rank": 1, "team": "Michigan", "points": "301.2"})])
    }
}

fn settings_in(root: &PathBuf) -> Settings {
    Settings {
        cache_dir: root.join("cache"),
        out_dir: root.join("out"),
        seasons: vec![2019],
        ..Settings::default()
    }
}

#[test]
fn full_run_writes_three_tables() {
    let root = scratch_dir("pipeline_full");
    let settings = settings_in(&root);
    let source = OneSeason::default();

    let summary = pipeline::run(&settings, &source).unwrap();
    assert_eq!(summary.games_rows, Some(2));
    assert_eq!(summary.teams, Some(2));
    assert_eq!(summary.recruiting_rows, Some(1));
    assert_eq!(summary.stats.rows, 2);
    assert_eq!(summary.stats.seasons_fetched, 1);
    assert_eq!(source.stat_requests.get(), 2);
    assert_eq!(summary.outputs.len(), 3);

    let stats = WideTable::read_csv_file(&settings.out_dir.join(STATS_FILE)).unwrap();
    assert_eq!(stats.cell(0, "home.thirdDownEff"), Some("0.5333333333333333"));
    assert_eq!(stats.cell(0, "home.fourthDownEff"), Some("0"));
    assert_eq!(stats.cell(1, "away.thirdDownEff"), Some("0.8333333333333334"));
    assert_eq!(stats.cell(1, "away.fourthDownEff"), None);

    let games = WideTable::read_csv_file(&settings.out_dir.join(GAMES_FILE)).unwrap();
    assert_eq!(games.cell(1, "neutral_site"), Some("false"));
    assert_eq!(games.cell(0, "neutral_site"), None);
    assert!(settings.out_dir.join(RECRUITING_FILE).is_file());
    assert!(settings.cache_dir.join("games_2019.json").is_file());

    // Second run: stats and teams come from cache.
    let again = pipeline::run(&settings, &source).unwrap();
    assert_eq!(again.stats.seasons_cached, 1);
    assert_eq!(source.stat_requests.get(), 2);
    assert_eq!(source.team_requests.get(), 1);

    fs::remove_dir_all(root).ok();
}

#[test]
fn clear_cache_refetches() {
    let root = scratch_dir("pipeline_clear");
    let mut settings = settings_in(&root);
    let source = OneSeason::default();
    pipeline::run(&settings, &source).unwrap();

    settings.clear_cache = true;
    let summary = pipeline::run(&settings, &source).unwrap();
    assert_eq!(summary.seasons_replaced, 1);
    assert_eq!(summary.stats.seasons_fetched, 1);
    assert_eq!(source.stat_requests.get(), 4);
    assert_eq!(source.team_requests.get(), 2);

    fs::remove_dir_all(root).ok();
}

#[test]
fn clear_cache_keeps_unselected_seasons() {
    let root = scratch_dir("pipeline_clear_scope");
    let mut settings = settings_in(&root);
    settings.seasons = vec![2019, 2020];
    let source = OneSeason::default();
    pipeline::run(&settings, &source).unwrap();

    let cache = SeasonCache::new(&settings.cache_dir);
    assert_eq!(cache.seasons().unwrap(), vec![2019, 2020]);
    let kept = fs::read(cache.path_for(2020)).unwrap();

    settings.seasons = vec![2019];
    settings.clear_cache = true;
    let summary = pipeline::run(&settings, &source).unwrap();
    assert_eq!(summary.seasons_replaced, 1);
    assert_eq!(cache.seasons().unwrap(), vec![2019, 2020]);
    assert_eq!(fs::read(cache.path_for(2020)).unwrap(), kept);

    fs::remove_dir_all(root).ok();
}

#[test]
fn failed_refresh_keeps_cached_season() {
    let root = scratch_dir("pipeline_refresh_fail");
    let mut settings = settings_in(&root);
    let source = OneSeason::default();
    pipeline::run(&settings, &source).unwrap();

    let cache = SeasonCache::new(&settings.cache_dir);
    let before = cache.load(2019).unwrap();

    settings.clear_cache = true;
    source.stats_down.set(true);
    let err = pipeline::run(&settings, &source).unwrap_err();
    assert!(format!("{err:#}").contains("503"), "{err:#}");
    assert!(cache.has(2019));
    assert_eq!(cache.load(2019).unwrap(), before);

    fs::remove_dir_all(root).ok();
}

#[test]
fn offline_run_uses_cache_only() {
    let root = scratch_dir("pipeline_offline");
    let mut settings = settings_in(&root);
    pipeline::run(&settings, &OneSeason::default()).unwrap();

    settings.offline = true;
    settings.legacy_patch = true;
    let summary = pipeline::run(&settings, &Offline).unwrap();
    assert_eq!(summary.stats.rows, 2);
    assert_eq!(summary.games_rows, None);
    assert!(summary.normalize.patched);

    let stats = WideTable::read_csv_file(&settings.out_dir.join(STATS_FILE)).unwrap();
    assert_eq!(stats.cell(0, "away.thirdDownEff"), Some("0.4"));
    assert_eq!(stats.cell(1, "away.thirdDownEff"), Some("0.8333333333333334"));

    settings.seasons = vec![2019, 2020];
    assert!(pipeline::run(&settings, &Offline).is_err());

    fs::remove_dir_all(root).ok();
}
