use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::ScanCache;
use crate::error::Result;
use crate::model::{TaskEntry, TaskItem};
use crate::query::Keyword;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub query: Option<String>,
    pub status: Option<String>,
    pub team_name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            query: None,
            status: None,
            team_name: None,
            limit: default_limit(),
        }
    }
}

/// Team tasks laid out as `tasks/<team>/<task>.json`. Cached until
/// [`TaskLoader::invalidate`].
pub struct TaskLoader {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
    cache: ScanCache<Vec<TaskEntry>>,
}

impl TaskLoader {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
            cache: ScanCache::new(),
        }
    }

    pub async fn entries(&self) -> Result<Arc<Vec<TaskEntry>>> {
        self.cache.get_or_load(|| self.scan()).await
    }

    async fn scan(&self) -> Result<Vec<TaskEntry>> {
        let mut entries = Vec::new();
        for path in self.scanner.scan(&self.dir, "*/*.json")? {
            let Some(team_name) = team_of(&path) else {
                continue;
            };
            match self.reader.read_json::<TaskItem>(&path).await {
                Ok(task) if !task.id.is_empty() && !task.subject.is_empty() => {
                    entries.push(TaskEntry { team_name, task })
                }
                Ok(_) => debug!(path = %path.display(), "skipping task without id or subject"),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping task file"),
            }
        }
        Ok(entries)
    }

    pub async fn search(&self, query: &TaskQuery) -> Result<Vec<TaskEntry>> {
        let entries = self.entries().await?;
        let keyword = Keyword::from_option(query.query.as_deref());
        let status = query.status.as_deref().filter(|s| !s.is_empty());
        let team = query.team_name.as_deref().filter(|t| !t.is_empty());

        Ok(entries
            .iter()
            .filter(|e| team.map_or(true, |t| e.team_name == t))
            .filter(|e| status.map_or(true, |s| e.task.status == s))
            .filter(|e| {
                keyword.as_ref().map_or(true, |k| {
                    k.matches(&format!("{} {}", e.task.subject, e.task.description))
                })
            })
            .take(query.limit)
            .cloned()
            .collect())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn disk_loads(&self) -> usize {
        self.cache.load_count()
    }
}

fn team_of(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_task(root: &Path, team: &str, id: &str, body: serde_json::Value) {
        let dir = root.join(team);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.json")), body.to_string()).unwrap();
    }

    fn fixture(root: &Path) {
        write_task(
            root,
            "alpha",
            "1",
            json!({
                "id": "1", "subject": "Parse config", "description": "Support YAML files",
                "status": "pending", "blocks": ["2"], "blockedBy": [], "metadata": {}
            }),
        );
        write_task(
            root,
            "alpha",
            "2",
            json!({
                "id": "2", "subject": "Wire server", "description": "after config parsing",
                "status": "completed", "owner": "agent-1", "blocks": [], "blockedBy": ["1"]
            }),
        );
        write_task(
            root,
            "beta",
            "3",
            json!({"id": "3", "subject": "Write docs", "status": "pending"}),
        );
        write_task(root, "beta", "4", json!({"id": "4", "description": "no subject"}));
        std::fs::write(root.join("beta/5.json"), "garbage").unwrap();
    }

    #[tokio::test]
    async fn skips_incomplete_and_malformed_tasks() {
        let dir = tempdir().unwrap();
        fixture(dir.path());
        let loader = TaskLoader::new(dir.path().to_path_buf(), FileReader::default());
        let entries = loader.entries().await.unwrap();
        let ids: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.team_name.as_str(), e.task.id.as_str()))
            .collect();
        assert_eq!(ids, vec![("alpha", "1"), ("alpha", "2"), ("beta", "3")]);
        assert_eq!(entries[1].task.blocked_by, vec!["1"]);
    }

    #[tokio::test]
    async fn keyword_covers_subject_and_description() {
        let dir = tempdir().unwrap();
        fixture(dir.path());
        let loader = TaskLoader::new(dir.path().to_path_buf(), FileReader::default());

        let hits = loader
            .search(&TaskQuery {
                query: Some("config".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let pending_alpha = loader
            .search(&TaskQuery {
                query: Some("config".into()),
                status: Some("pending".into()),
                team_name: Some("alpha".into()),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(pending_alpha.len(), 1);
        assert_eq!(pending_alpha[0].task.id, "1");

        let limited = loader
            .search(&TaskQuery {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let loader = TaskLoader::new(dir.path().join("tasks"), FileReader::default());
        assert!(loader.search(&TaskQuery::default()).await.unwrap().is_empty());
    }
}
