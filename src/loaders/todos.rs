use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::ScanCache;
use crate::error::{HistoryError, Result};
use crate::model::{TodoFile, TodoHit, TodoItem};
use crate::pagination::{paginate, Paginated};
use crate::query::Keyword;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoQuery {
    pub query: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for TodoQuery {
    fn default() -> Self {
        Self {
            query: None,
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Todo lists, one JSON array per file. The scan is cached until
/// [`TodoLoader::invalidate`] is called.
pub struct TodoLoader {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
    cache: ScanCache<Vec<TodoFile>>,
}

impl TodoLoader {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
            cache: ScanCache::new(),
        }
    }

    pub async fn files(&self) -> Result<Arc<Vec<TodoFile>>> {
        self.cache.get_or_load(|| self.scan()).await
    }

    async fn scan(&self) -> Result<Vec<TodoFile>> {
        let mut files = Vec::new();
        for path in self.scanner.scan(&self.dir, "*.json")? {
            match self.load_file(&path).await {
                Ok(file) => files.push(file),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping todo file"),
            }
        }
        Ok(files)
    }

    async fn load_file(&self, path: &Path) -> Result<TodoFile> {
        let raw = self.reader.read_to_string(path).await?;
        let parsed: Value = serde_json::from_str(&raw).map_err(|e| HistoryError::parse(path, e))?;
        // Anything other than an array is an empty list.
        let items = match parsed {
            Value::Array(values) => values
                .into_iter()
                .filter_map(|v| serde_json::from_value::<TodoItem>(v).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(TodoFile {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            items,
        })
    }

    pub async fn search(&self, query: &TodoQuery) -> Result<Paginated<TodoHit>> {
        let files = self.files().await?;
        let keyword = Keyword::from_option(query.query.as_deref());
        let status = query.status.as_deref().filter(|s| !s.is_empty());

        let hits: Vec<TodoHit> = files
            .iter()
            .flat_map(|file| file.items.iter().map(move |item| (file, item)))
            .filter(|(_, item)| keyword.as_ref().map_or(true, |k| k.matches(&item.content)))
            .filter(|(_, item)| status.map_or(true, |s| item.status == s))
            .map(|(file, item)| TodoHit {
                item: item.clone(),
                filename: file.filename.clone(),
            })
            .collect();

        Ok(paginate(&hits, query.offset, query.limit))
    }

    /// Forget the cached scan; the next query rescans the directory.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn disk_loads(&self) -> usize {
        self.cache.load_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_todos(dir: &Path, name: &str, items: Value) {
        std::fs::write(dir.join(name), items.to_string()).unwrap();
    }

    #[tokio::test]
    async fn items_carry_their_filename() {
        let dir = tempdir().unwrap();
        write_todos(
            dir.path(),
            "s1-agent.json",
            json!([
                {"content": "Write tests", "status": "pending", "priority": "high", "id": "1"},
                {"content": "Fix build", "status": "completed", "priority": "low", "id": "2"}
            ]),
        );
        write_todos(
            dir.path(),
            "s2-agent.json",
            json!([{"content": "Review PR", "status": "in_progress", "activeForm": "Reviewing PR"}]),
        );
        std::fs::write(dir.path().join("broken.json"), "[{").unwrap();
        write_todos(dir.path(), "object.json", json!({"content": "not a list"}));

        let loader = TodoLoader::new(dir.path().to_path_buf(), FileReader::default());
        let all = loader.search(&TodoQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
        let origins: Vec<&str> = all.items.iter().map(|h| h.filename.as_str()).collect();
        assert_eq!(origins, vec!["s1-agent.json", "s1-agent.json", "s2-agent.json"]);
        assert_eq!(all.items[2].item.active_form.as_deref(), Some("Reviewing PR"));
    }

    #[tokio::test]
    async fn filters_by_status_and_keyword() {
        let dir = tempdir().unwrap();
        write_todos(
            dir.path(),
            "a.json",
            json!([
                {"content": "Write tests", "status": "pending", "priority": "high", "id": "1"},
                {"content": "write docs", "status": "completed", "priority": "low", "id": "2"},
                {"content": "Deploy", "status": "pending", "priority": "low", "id": "3"}
            ]),
        );
        let loader = TodoLoader::new(dir.path().to_path_buf(), FileReader::default());

        let page = loader
            .search(&TodoQuery {
                query: Some("WRITE".into()),
                status: Some("pending".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].item.id, "1");
    }

    #[tokio::test]
    async fn cache_is_stale_until_invalidated() {
        let dir = tempdir().unwrap();
        write_todos(dir.path(), "a.json", json!([{"content": "one", "status": "pending"}]));
        let loader = TodoLoader::new(dir.path().to_path_buf(), FileReader::default());
        assert_eq!(loader.search(&TodoQuery::default()).await.unwrap().total, 1);

        write_todos(dir.path(), "b.json", json!([{"content": "two", "status": "pending"}]));
        assert_eq!(loader.search(&TodoQuery::default()).await.unwrap().total, 1);

        loader.invalidate();
        assert_eq!(loader.search(&TodoQuery::default()).await.unwrap().total, 2);
        assert_eq!(loader.disk_loads(), 2);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let loader = TodoLoader::new(dir.path().join("todos"), FileReader::default());
        let page = loader.search(&TodoQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }
}
