use std::path::{Path, PathBuf};

/// Well-known locations under the assistant's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    pub history: PathBuf,
    pub plans: PathBuf,
    pub todos: PathBuf,
    pub tasks: PathBuf,
    pub teams: PathBuf,
    pub debug: PathBuf,
    pub stats: PathBuf,
    pub projects: PathBuf,
    pub settings: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            history: root.join("history.jsonl"),
            plans: root.join("plans"),
            todos: root.join("todos"),
            tasks: root.join("tasks"),
            teams: root.join("teams"),
            debug: root.join("debug"),
            stats: root.join("stats-cache.json"),
            projects: root.join("projects"),
            settings: root.join("settings.json"),
            root,
        }
    }

    /// `~/.claude`, or `./.claude` when no home directory can be determined.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude")
    }

    pub fn team_config(&self, team: &str) -> PathBuf {
        self.teams.join(team).join("config.json")
    }

    pub fn sessions_index(&self, project_dir: &str) -> PathBuf {
        self.projects.join(project_dir).join("sessions-index.json")
    }

    pub fn debug_log(&self, session_id: &str) -> PathBuf {
        self.debug.join(format!("{session_id}.txt"))
    }

    pub fn debug_latest(&self) -> PathBuf {
        self.debug.join("latest")
    }
}
