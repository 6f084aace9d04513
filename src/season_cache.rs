use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::Season;
use crate::wide_table::WideTable;

const FILE_PREFIX: &str = "game_stats_";
const FILE_EXT: &str = "csv";

/// No expiry and no integrity check: whatever file is present for a season is
/// taken as that season's complete table until it is cleared.
#[derive(Debug, Clone)]
pub struct SeasonCache {
    dir: PathBuf,
}

impl SeasonCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let cache = Self::new(dir);
        fs::create_dir_all(&cache.dir)
            .with_context(|| format!("create cache dir {}", cache.dir.display()))?;
        Ok(cache)
    }

    pub fn path_for(&self, season: Season) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{season}.{FILE_EXT}"))
    }

    pub fn has(&self, season: Season) -> bool {
        self.path_for(season).is_file()
    }

    pub fn load(&self, season: Season) -> Result<WideTable> {
        let path = self.path_for(season);
        if !path.is_file() {
            return Err(anyhow!(
                "no cached stats for season {season} at {}",
                path.display()
            ));
        }
        WideTable::read_csv_file(&path).with_context(|| format!("load cached season {season}"))
    }

    pub fn store(&self, season: Season, table: &WideTable) -> Result<()> {
        let path = self.path_for(season);
        table
            .write_csv_file(&path)
            .with_context(|| format!("store cached season {season}"))?;
        debug!(season, rows = table.row_count(), path = %path.display(), "season cached");
        Ok(())
    }

    pub fn clear(&self, season: Season) -> Result<bool> {
        let path = self.path_for(season);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        Ok(true)
    }

    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for season in self.seasons()? {
            if self.clear(season)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn seasons(&self) -> Result<Vec<Season>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("list {}", self.dir.display()));
            }
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("list {}", self.dir.display()))?;
            let name = entry.file_name();
            let Some(season) = name.to_str().and_then(parse_cache_file_name) else {
                continue;
            };
            out.push(season);
        }
        out.sort_unstable();
        Ok(out)
    }
}

fn parse_cache_file_name(name: &str) -> Option<Season> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}
