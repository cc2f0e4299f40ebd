use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::DebugMatch;
use crate::query::Keyword;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugQuery {
    pub session_id: Option<String>,
    pub query: Option<String>,
    pub tail_lines: Option<usize>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl Default for DebugQuery {
    fn default() -> Self {
        Self {
            session_id: None,
            query: None,
            tail_lines: None,
            limit: default_limit(),
        }
    }
}

/// Debug logs under `debug/`, one `<session>.txt` per session plus a `latest`
/// symlink to the live log. Files are streamed, never loaded whole.
pub struct DebugLogSearch {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
}

impl DebugLogSearch {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
        }
    }

    /// Files to read: the named session's log, else whatever `latest` points
    /// at, else every `*.txt` in the directory.
    pub async fn targets(&self, session_id: Option<&str>) -> Result<Vec<PathBuf>> {
        if let Some(id) = session_id.filter(|s| !s.is_empty()) {
            if !is_plain_name(id) {
                warn!(session_id = %id, "rejecting session id with path components");
                return Ok(Vec::new());
            }
            return Ok(vec![self.dir.join(format!("{id}.txt"))]);
        }

        match tokio::fs::canonicalize(self.dir.join("latest")).await {
            Ok(live) => Ok(vec![live]),
            Err(_) => self.scanner.scan(&self.dir, "*.txt"),
        }
    }

    pub async fn search(&self, query: &DebugQuery) -> Result<Vec<DebugMatch>> {
        let keyword = Keyword::from_option(query.query.as_deref());
        let tail = query.tail_lines.filter(|n| *n > 0 && keyword.is_none());
        let mut matches = Vec::new();

        for path in self.targets(query.session_id.as_deref()).await? {
            let budget = query.limit.saturating_sub(matches.len());
            if budget == 0 {
                break;
            }
            let found = match tail {
                Some(n) => self.tail(&path, n, budget).await,
                None => self.scan_file(&path, keyword.as_ref(), budget).await,
            };
            match found {
                Ok(found) => matches.extend(found),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping debug log"),
            }
        }

        matches.truncate(query.limit);
        Ok(matches)
    }

    /// Last `n` lines, numbered by their position inside the tail window.
    async fn tail(&self, path: &Path, n: usize, budget: usize) -> Result<Vec<DebugMatch>> {
        let file = path.display().to_string();
        let lines = self.reader.tail_lines(path, n).await?;
        Ok(lines
            .into_iter()
            .take(budget)
            .enumerate()
            .map(|(i, text)| DebugMatch {
                file: file.clone(),
                line: i + 1,
                text,
            })
            .collect())
    }

    /// Matching lines with their 1-based line numbers. Reading stops, and the
    /// file is closed, once `budget` matches are collected.
    async fn scan_file(
        &self,
        path: &Path,
        keyword: Option<&Keyword>,
        budget: usize,
    ) -> Result<Vec<DebugMatch>> {
        let file = path.display().to_string();
        let mut lines = self.reader.read_lines(path).await?;
        let mut found = Vec::new();
        let mut line_no = 0usize;

        while let Some(line) = lines.next().await {
            let line = line?;
            line_no += 1;
            if keyword.map_or(true, |k| k.matches(&line)) {
                found.push(DebugMatch {
                    file: file.clone(),
                    line: line_no,
                    text: line,
                });
                if found.len() >= budget {
                    break;
                }
            }
        }
        Ok(found)
    }
}

fn is_plain_name(id: &str) -> bool {
    !id.contains('/') && !id.contains('\\') && id != "." && id != ".."
}
