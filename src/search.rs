use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::loaders::{
    DebugLogSearch, DebugQuery, HistoryLoader, HistoryQuery, PlanLoader, PlanQuery,
    ProjectLoader, ProjectSessionsQuery, SettingsLoader, StatsLoader, StatsQuery, TaskLoader,
    TaskQuery, TeamLoader, TodoLoader, TodoQuery,
};
use crate::model::{
    ActivityStats, DebugMatch, HistoryEntry, PlanSummary, ProjectInfo, ProjectSessions,
    SearchMatch, Settings, Source, TaskEntry, TeamConfig, TodoHit,
};
use crate::pagination::Paginated;
use crate::paths::DataPaths;
use crate::query::{excerpt_around, prefix_chars, Keyword};
use crate::reader::FileReader;

const PLAN_PREVIEW_CHARS: usize = 500;
const CONTEXT_CHARS: usize = 200;
const TASK_CONTEXT_CHARS: usize = 150;
const MIN_PER_SOURCE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAllQuery {
    pub query: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default = "default_search_all_limit")]
    pub limit: usize,
}

fn default_search_all_limit() -> usize {
    30
}

impl SearchAllQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: None,
            limit: default_search_all_limit(),
        }
    }
}

/// Search engine: owns one loader per source and fans cross-source queries out
/// to them.
pub struct SearchEngine {
    paths: DataPaths,
    history: HistoryLoader,
    plans: PlanLoader,
    todos: TodoLoader,
    tasks: TaskLoader,
    teams: TeamLoader,
    debug: DebugLogSearch,
    projects: ProjectLoader,
    stats: StatsLoader,
    settings: SettingsLoader,
}

impl SearchEngine {
    pub fn new(paths: DataPaths) -> Self {
        Self::with_reader(paths, FileReader::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_reader(
            config.data_paths(),
            FileReader::new(config.reader.buffer_size),
        )
    }

    pub fn with_reader(paths: DataPaths, reader: FileReader) -> Self {
        Self {
            history: HistoryLoader::new(paths.history.clone(), reader.clone()),
            plans: PlanLoader::new(paths.plans.clone(), reader.clone()),
            todos: TodoLoader::new(paths.todos.clone(), reader.clone()),
            tasks: TaskLoader::new(paths.tasks.clone(), reader.clone()),
            teams: TeamLoader::new(paths.teams.clone(), reader.clone()),
            debug: DebugLogSearch::new(paths.debug.clone(), reader.clone()),
            projects: ProjectLoader::new(paths.projects.clone(), reader.clone()),
            stats: StatsLoader::new(paths.stats.clone(), reader.clone()),
            settings: SettingsLoader::new(paths.settings.clone(), reader),
            paths,
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn history(&self) -> &HistoryLoader {
        &self.history
    }

    pub async fn search_history(&self, query: &HistoryQuery) -> Result<Paginated<HistoryEntry>> {
        self.history.search(query).await
    }

    pub async fn search_plans(&self, query: &PlanQuery) -> Result<Vec<PlanSummary>> {
        let plans = self.plans.search(query).await?;
        Ok(plans
            .iter()
            .map(|p| PlanSummary {
                filename: p.filename.clone(),
                preview: prefix_chars(&p.content, PLAN_PREVIEW_CHARS).to_string(),
                size: p.content.chars().count(),
            })
            .collect())
    }

    pub async fn search_todos(&self, query: &TodoQuery) -> Result<Paginated<TodoHit>> {
        self.todos.search(query).await
    }

    pub async fn search_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskEntry>> {
        self.tasks.search(query).await
    }

    pub async fn list_teams(&self, team_name: Option<&str>) -> Result<Vec<TeamConfig>> {
        self.teams.list(team_name).await
    }

    pub async fn search_debug_logs(&self, query: &DebugQuery) -> Result<Vec<DebugMatch>> {
        self.debug.search(query).await
    }

    pub async fn activity_stats(&self, query: &StatsQuery) -> Result<ActivityStats> {
        self.stats.activity(query).await
    }

    pub async fn list_projects(&self, query: Option<&str>) -> Result<Vec<ProjectInfo>> {
        self.projects.list(query).await
    }

    pub async fn project_sessions(&self, query: &ProjectSessionsQuery) -> Result<ProjectSessions> {
        self.projects.sessions(query).await
    }

    pub async fn settings(&self) -> Result<Settings> {
        self.settings.load().await
    }

    /// Drop the todo, task and team scans. Must be called after those
    /// directories change on disk; nothing else notices.
    pub fn invalidate_scan_caches(&self) {
        self.todos.invalidate();
        self.tasks.invalidate();
        self.teams.invalidate();
    }

    /// Run `query` against every requested source at once, each capped at its
    /// per-source budget. A failing source contributes nothing; it never fails
    /// the whole search. Results keep source-declaration order.
    pub async fn search_all(&self, query: &SearchAllQuery) -> Result<Vec<SearchMatch>> {
        let active = active_sources(query.sources.as_deref());
        if active.is_empty() {
            return Ok(Vec::new());
        }
        let budget = per_source_budget(query.limit, active.len());
        let keyword = Keyword::new(&query.query);
        debug!(sources = active.len(), budget, "fanning out search");

        let per_source: Vec<Vec<SearchMatch>> = stream::iter(active.iter().copied())
            .map(|source| {
                let keyword = &keyword;
                async move {
                    match self.search_source(source, keyword, budget).await {
                        Ok(matches) => matches,
                        Err(e) => {
                            warn!(source = %source, error = %e, "source failed during search_all");
                            Vec::new()
                        }
                    }
                }
            })
            .buffered(active.len())
            .collect()
            .await;

        Ok(per_source
            .into_iter()
            .flatten()
            .take(query.limit)
            .collect())
    }

    async fn search_source(
        &self,
        source: Source,
        keyword: &Keyword,
        budget: usize,
    ) -> Result<Vec<SearchMatch>> {
        let text = Some(keyword.as_str().to_string());
        let mut matches = Vec::new();

        match source {
            Source::History => {
                let page = self
                    .history
                    .search(&HistoryQuery {
                        query: text,
                        limit: budget,
                        ..Default::default()
                    })
                    .await?;
                for entry in page.items {
                    let context = prefix_chars(&entry.display, CONTEXT_CHARS).to_string();
                    let mut item = serde_json::to_value(&entry)?;
                    if let Value::Object(map) = &mut item {
                        map.remove("pastedContents");
                    }
                    matches.push(tagged(source, item, context));
                }
            }
            Source::Plans => {
                let plans = self
                    .plans
                    .search(&PlanQuery {
                        query: text,
                        limit: budget,
                    })
                    .await?;
                for plan in plans {
                    let context = match keyword.find_in(&plan.content) {
                        Some(at) => {
                            excerpt_around(&plan.content, at, keyword.as_str().len(), 50, 100)
                        }
                        None => prefix_chars(&plan.content, TASK_CONTEXT_CHARS),
                    };
                    let item = serde_json::json!({ "filename": plan.filename });
                    matches.push(tagged(source, item, context.to_string()));
                }
            }
            Source::Todos => {
                let page = self
                    .todos
                    .search(&TodoQuery {
                        query: text,
                        limit: budget,
                        ..Default::default()
                    })
                    .await?;
                for hit in page.items {
                    let context = prefix_chars(&hit.item.content, CONTEXT_CHARS).to_string();
                    matches.push(tagged(source, serde_json::to_value(&hit)?, context));
                }
            }
            Source::Tasks => {
                let entries = self
                    .tasks
                    .search(&TaskQuery {
                        query: text,
                        limit: budget,
                        ..Default::default()
                    })
                    .await?;
                for entry in entries {
                    let context = format!(
                        "{}: {}",
                        entry.task.subject,
                        prefix_chars(&entry.task.description, TASK_CONTEXT_CHARS)
                    );
                    let mut item = serde_json::to_value(&entry.task)?;
                    if let Value::Object(map) = &mut item {
                        map.insert("teamName".to_string(), Value::String(entry.team_name));
                    }
                    matches.push(tagged(source, item, context));
                }
            }
            Source::Debug => {
                let hits = self
                    .debug
                    .search(&DebugQuery {
                        query: text,
                        limit: budget,
                        ..Default::default()
                    })
                    .await?;
                for hit in hits {
                    let context = prefix_chars(&hit.text, CONTEXT_CHARS).to_string();
                    matches.push(tagged(source, serde_json::to_value(&hit)?, context));
                }
            }
            Source::Projects => {
                let projects = self.projects.list(Some(keyword.as_str())).await?;
                for project in projects.into_iter().take(budget) {
                    let context = project
                        .original_path
                        .clone()
                        .unwrap_or_else(|| project.dir_name.clone());
                    matches.push(tagged(source, serde_json::to_value(&project)?, context));
                }
            }
        }
        Ok(matches)
    }
}

fn tagged(source: Source, item: Value, context: String) -> SearchMatch {
    SearchMatch {
        source,
        item,
        match_context: Some(context),
    }
}

/// Each active source may contribute `ceil(limit / sources)` results, but never
/// fewer than three.
pub fn per_source_budget(limit: usize, sources: usize) -> usize {
    if sources == 0 {
        return MIN_PER_SOURCE;
    }
    ((limit + sources - 1) / sources).max(MIN_PER_SOURCE)
}

/// Requested sources in declaration order; unknown names are dropped.
pub fn active_sources(requested: Option<&[String]>) -> Vec<Source> {
    let Some(requested) = requested else {
        return Source::ALL.to_vec();
    };
    for name in requested {
        if name.parse::<Source>().is_err() {
            debug!(source = %name, "ignoring unknown source");
        }
    }
    Source::ALL
        .into_iter()
        .filter(|s| requested.iter().any(|r| r == s.as_str()))
        .collect()
}
