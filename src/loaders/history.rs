use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::FileCache;
use crate::error::Result;
use crate::model::HistoryEntry;
use crate::pagination::{paginate, Paginated};
use crate::query::{DateRange, Keyword};
use crate::reader::FileReader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub query: Option<String>,
    pub project: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            query: None,
            project: None,
            start_date: None,
            end_date: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Conversation history from the append-only `history.jsonl`.
///
/// The file is expected to exist; a missing file is reported as an error.
pub struct HistoryLoader {
    path: PathBuf,
    reader: FileReader,
    cache: FileCache<Vec<HistoryEntry>>,
}

impl HistoryLoader {
    pub fn new(path: PathBuf, reader: FileReader) -> Self {
        Self {
            path,
            reader,
            cache: FileCache::new(),
        }
    }

    pub async fn entries(&self) -> Result<Arc<Vec<HistoryEntry>>> {
        self.cache
            .get_or_load(&self.path, |_| async {
                let raw = self.reader.read_to_string(&self.path).await?;
                Ok(parse_history(&raw))
            })
            .await
    }

    /// Filtered entries, most recent first, then paginated.
    pub async fn search(&self, query: &HistoryQuery) -> Result<Paginated<HistoryEntry>> {
        let entries = self.entries().await?;
        let keyword = Keyword::from_option(query.query.as_deref());
        let range = DateRange::new(query.start_date.as_deref(), query.end_date.as_deref());
        let project = query.project.as_deref().filter(|p| !p.is_empty());

        let mut filtered: Vec<&HistoryEntry> = entries
            .iter()
            .rev()
            .filter(|e| keyword.as_ref().map_or(true, |k| k.matches(&e.display)))
            .filter(|e| project.map_or(true, |p| e.project.as_deref() == Some(p)))
            .filter(|e| range.contains_millis(e.timestamp_millis()))
            .collect();
        filtered.sort_by_key(|e| std::cmp::Reverse(e.timestamp_millis()));

        Ok(paginate(&filtered, query.offset, query.limit).map(|e| e.clone()))
    }

    /// How many times the history file has been read from disk.
    pub fn disk_loads(&self) -> usize {
        self.cache.load_count()
    }
}

fn parse_history(raw: &str) -> Vec<HistoryEntry> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(line = idx + 1, error = %e, "skipping malformed history line");
                None
            }
        })
        .collect()
}
