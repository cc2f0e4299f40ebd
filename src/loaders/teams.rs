use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ScanCache;
use crate::error::Result;
use crate::model::TeamConfig;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

struct TeamRecord {
    dir_name: String,
    config: TeamConfig,
}

/// Team configs at `teams/<team>/config.json`. Cached until
/// [`TeamLoader::invalidate`].
pub struct TeamLoader {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
    cache: ScanCache<Vec<TeamRecord>>,
}

impl TeamLoader {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
            cache: ScanCache::new(),
        }
    }

    async fn records(&self) -> Result<Arc<Vec<TeamRecord>>> {
        self.cache
            .get_or_load(|| async {
                let mut records = Vec::new();
                for dir_name in self.scanner.subdirs(&self.dir) {
                    let path = self.dir.join(&dir_name).join("config.json");
                    match self.reader.read_json::<TeamConfig>(&path).await {
                        Ok(config) => records.push(TeamRecord { dir_name, config }),
                        Err(e) => debug!(team = %dir_name, error = %e, "skipping team"),
                    }
                }
                Ok(records)
            })
            .await
    }

    /// All teams, or only the team whose directory is named `team_name`.
    pub async fn list(&self, team_name: Option<&str>) -> Result<Vec<TeamConfig>> {
        let records = self.records().await?;
        let team_name = team_name.filter(|t| !t.is_empty());
        Ok(records
            .iter()
            .filter(|r| team_name.map_or(true, |t| r.dir_name == t))
            .map(|r| r.config.clone())
            .collect())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}
