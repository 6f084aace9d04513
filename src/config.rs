use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use crate::Season;
use crate::stats_fetch::DEFAULT_MAX_WEEKS;

pub const API_KEY_ENV: &str = "CFBD_API_KEY";
pub const DEFAULT_CACHE_DIR: &str = "data/raw_data/temp";
pub const DEFAULT_OUT_DIR: &str = "data";
pub const DEFAULT_SEASON_TYPE: &str = "regular";
pub const DEFAULT_CONFERENCE: &str = "B1G";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub cache_dir: PathBuf,
    pub out_dir: PathBuf,
    pub seasons: Vec<Season>,
    pub season_type: String,
    pub conference: Option<String>,
    pub max_weeks: u32,
    pub clear_cache: bool,
    pub offline: bool,
    pub legacy_patch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            seasons: (2013..=2021).collect(),
            season_type: DEFAULT_SEASON_TYPE.to_string(),
            conference: Some(DEFAULT_CONFERENCE.to_string()),
            max_weeks: DEFAULT_MAX_WEEKS,
            clear_cache: false,
            offline: false,
            legacy_patch: false,
        }
    }
}

impl Settings {
    /// Defaults overridden by the process environment. Call after dotenvy
    /// has loaded `.env.local` / `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        settings.api_key = lookup(API_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(dir) = non_empty(lookup("CFB_CACHE_DIR")) {
            settings.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(lookup("CFB_OUT_DIR")) {
            settings.out_dir = PathBuf::from(dir);
        }
        if let Some(raw) = non_empty(lookup("CFB_SEASONS")) {
            settings.seasons = parse_seasons(&raw).context("CFB_SEASONS")?;
        }
        if let Some(raw) = non_empty(lookup("CFB_SEASON_TYPE")) {
            settings.season_type = raw;
        }
        // Set but empty means every conference.
        if let Some(raw) = lookup("CFB_CONFERENCE") {
            settings.conference = non_empty(Some(raw));
        }
        if let Some(raw) = non_empty(lookup("CFB_MAX_WEEKS")) {
            settings.max_weeks = raw
                .parse::<u32>()
                .with_context(|| format!("CFB_MAX_WEEKS: invalid number {raw:?}"))?;
        }
        Ok(settings)
    }

    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        let mut idx = 0;
        while idx < args.len() {
            let arg = args[idx].as_str();
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg, None),
            };
            let mut value = || -> Result<String> {
                if let Some(v) = inline.clone() {
                    return Ok(v);
                }
                idx += 1;
                args.get(idx)
                    .cloned()
                    .ok_or_else(|| anyhow!("missing value for {flag}"))
            };
            match flag {
                "--seasons" => self.seasons = parse_seasons(&value()?)?,
                "--cache-dir" => self.cache_dir = PathBuf::from(value()?),
                "--out-dir" => self.out_dir = PathBuf::from(value()?),
                "--conference" => self.conference = non_empty(Some(value()?)),
                "--season-type" => self.season_type = value()?,
                "--max-weeks" => {
                    let raw = value()?;
                    self.max_weeks = raw
                        .parse()
                        .with_context(|| format!("--max-weeks: invalid number {raw:?}"))?;
                }
                "--clear-cache" => self.clear_cache = true,
                "--offline" => self.offline = true,
                "--legacy-patch" => self.legacy_patch = true,
                other => return Err(anyhow!("unknown argument {other}")),
            }
            idx += 1;
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{API_KEY_ENV} not set (put it in .env.local)"))
    }
}

pub fn parse_seasons(raw: &str) -> Result<Vec<Season>> {
    let mut out = Vec::new();
    for part in raw.split([',', ';', ' ']).map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_season(start)?;
                let end = parse_season(end)?;
                if start > end {
                    return Err(anyhow!("season range {part} is reversed"));
                }
                out.extend(start..=end);
            }
            None => out.push(parse_season(part)?),
        }
    }
    if out.is_empty() {
        return Err(anyhow!("no seasons in {raw:?}"));
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn parse_season(raw: &str) -> Result<Season> {
    raw.trim()
        .parse::<Season>()
        .with_context(|| format!("invalid season {raw:?}"))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
