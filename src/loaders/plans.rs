use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::FileCache;
use crate::error::Result;
use crate::model::PlanDocument;
use crate::query::Keyword;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanQuery {
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for PlanQuery {
    fn default() -> Self {
        Self {
            query: None,
            limit: default_limit(),
        }
    }
}

/// Markdown plan documents, each cached under its own mtime so touching one
/// plan never forces the others to be re-read.
pub struct PlanLoader {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
    cache: FileCache<PlanDocument>,
}

impl PlanLoader {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
            cache: FileCache::new(),
        }
    }

    /// Every readable plan, ordered by filename.
    pub async fn load_all(&self) -> Result<Vec<Arc<PlanDocument>>> {
        let files = self.scanner.scan(&self.dir, "*.md")?;
        let present: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        self.cache.retain(|p| present.contains(p));

        let mut plans = Vec::with_capacity(files.len());
        for path in &files {
            match self.cache.get_or_load(path, |mtime| self.load_plan(path, mtime)).await {
                Ok(plan) => plans.push(plan),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable plan"),
            }
        }
        Ok(plans)
    }

    async fn load_plan(&self, path: &Path, mtime: SystemTime) -> Result<PlanDocument> {
        let content = self.reader.read_to_string(path).await?;
        Ok(PlanDocument {
            filename: file_name(path),
            content,
            mtime: epoch_millis(mtime),
        })
    }

    /// Without a keyword, the first `limit` plans by filename; otherwise plans
    /// whose content or filename contains the keyword.
    pub async fn search(&self, query: &PlanQuery) -> Result<Vec<Arc<PlanDocument>>> {
        let plans = self.load_all().await?;
        let keyword = Keyword::from_option(query.query.as_deref());
        Ok(plans
            .into_iter()
            .filter(|p| {
                keyword
                    .as_ref()
                    .map_or(true, |k| k.matches_any(&[p.content.as_str(), p.filename.as_str()]))
            })
            .take(query.limit)
            .collect())
    }

    pub fn disk_loads(&self) -> usize {
        self.cache.load_count()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn epoch_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn keyword_matches_content_or_filename() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b-refactor.md"), "# Plan\nMove the cache").unwrap();
        std::fs::write(dir.path().join("a-deploy.md"), "# Deploy\nship it").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "cache cache").unwrap();

        let loader = PlanLoader::new(dir.path().to_path_buf(), FileReader::default());

        let by_content = loader
            .search(&PlanQuery {
                query: Some("CACHE".into()),
                limit: 20,
            })
            .await
            .unwrap();
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].filename, "b-refactor.md");

        let by_name = loader
            .search(&PlanQuery {
                query: Some("deploy".into()),
                limit: 20,
            })
            .await
            .unwrap();
        assert_eq!(by_name[0].filename, "a-deploy.md");

        let all = loader.search(&PlanQuery::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["a-deploy.md", "b-refactor.md"]);
    }

    #[tokio::test]
    async fn touching_one_plan_reloads_only_that_plan() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.md");
        std::fs::write(&a, "alpha").unwrap();
        std::fs::write(dir.path().join("b.md"), "beta").unwrap();

        let loader = PlanLoader::new(dir.path().to_path_buf(), FileReader::default());
        loader.load_all().await.unwrap();
        assert_eq!(loader.disk_loads(), 2);

        loader.load_all().await.unwrap();
        assert_eq!(loader.disk_loads(), 2);

        std::fs::write(&a, "alpha v2").unwrap();
        let file = std::fs::File::options().write(true).open(&a).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
        drop(file);

        let plans = loader.load_all().await.unwrap();
        assert_eq!(plans[0].content, "alpha v2");
        assert_eq!(loader.disk_loads(), 3);
    }

    #[tokio::test]
    async fn plan_mtime_matches_cache_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "alpha").unwrap();
        let stamp = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(stamp).unwrap();
        drop(file);

        let loader = PlanLoader::new(dir.path().to_path_buf(), FileReader::default());
        let plans = loader.load_all().await.unwrap();
        assert_eq!(plans[0].mtime, 1_700_000_000_123);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let loader = PlanLoader::new(dir.path().join("plans"), FileReader::default());
        assert!(loader.search(&PlanQuery::default()).await.unwrap().is_empty());
    }
}
