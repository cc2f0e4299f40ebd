use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::FileCache;
use crate::error::Result;
use crate::model::{ProjectInfo, ProjectSessions, SessionsIndex};
use crate::query::Keyword;
use crate::reader::FileReader;
use crate::scanner::FileScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSessionsQuery {
    pub project: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Per-project `sessions-index.json` files under `projects/<encoded dir>/`.
pub struct ProjectLoader {
    dir: PathBuf,
    reader: FileReader,
    scanner: FileScanner,
    cache: FileCache<SessionsIndex>,
}

impl ProjectLoader {
    pub fn new(dir: PathBuf, reader: FileReader) -> Self {
        Self {
            dir,
            reader,
            scanner: FileScanner::new(),
            cache: FileCache::new(),
        }
    }

    async fn index(&self, dir_name: &str) -> Result<Arc<SessionsIndex>> {
        let path = self.dir.join(dir_name).join("sessions-index.json");
        self.cache
            .get_or_load(&path, |_| self.reader.read_json::<SessionsIndex>(&path))
            .await
    }

    /// Projects whose directory name or original path contains `query`.
    /// Projects without a readable index are listed with zero sessions.
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<ProjectInfo>> {
        let keyword = Keyword::from_option(query);
        let dirs = self.scanner.subdirs(&self.dir);
        {
            let present: HashSet<&str> = dirs.iter().map(String::as_str).collect();
            self.cache
                .retain(|path| project_of(path).map_or(false, |d| present.contains(d)));
        }

        let mut projects = Vec::new();
        for dir_name in dirs {
            let (original_path, session_count) = match self.index(&dir_name).await {
                Ok(index) => (index.original_path.clone(), index.entries.len()),
                Err(e) => {
                    debug!(project = %dir_name, error = %e, "no sessions index");
                    (None, 0)
                }
            };

            if let Some(k) = &keyword {
                let haystack = format!("{} {}", dir_name, original_path.as_deref().unwrap_or(""));
                if !k.matches(&haystack) {
                    continue;
                }
            }

            projects.push(ProjectInfo {
                dir_name,
                original_path,
                session_count,
            });
        }
        Ok(projects)
    }

    /// Sessions of the project whose directory equals `project`, or failing
    /// that the first directory containing it, newest first.
    pub async fn sessions(&self, query: &ProjectSessionsQuery) -> Result<ProjectSessions> {
        let dirs = self.scanner.subdirs(&self.dir);
        let matched = dirs
            .iter()
            .find(|d| **d == query.project)
            .or_else(|| dirs.iter().find(|d| d.contains(&query.project)));
        let Some(dir_name) = matched else {
            return Ok(ProjectSessions::default());
        };

        let index = match self.index(dir_name).await {
            Ok(index) => index,
            Err(e) => {
                debug!(project = %dir_name, error = %e, "no sessions index");
                return Ok(ProjectSessions::default());
            }
        };

        let mut sessions = index.entries.clone();
        sessions.sort_by_key(|s| std::cmp::Reverse(modified_millis(&s.modified)));
        sessions.truncate(query.limit);

        Ok(ProjectSessions {
            original_path: index.original_path.clone(),
            sessions,
        })
    }
}

/// Project directory owning a cached `sessions-index.json` path.
fn project_of(index_path: &Path) -> Option<&str> {
    index_path.parent()?.file_name()?.to_str()
}

fn modified_millis(iso: &str) -> i64 {
    DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(i64::MIN)
}
