use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One line of `history.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub display: String,
    #[serde(default)]
    pub pasted_contents: Map<String, Value>,
    /// Epoch milliseconds, kept as written.
    pub timestamp: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl HistoryEntry {
    /// Timestamp in whole milliseconds; fractional values are truncated.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp
            .as_i64()
            .or_else(|| self.timestamp.as_f64().map(|ms| ms as i64))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub filename: String,
    pub content: String,
    /// Modification time in epoch milliseconds.
    pub mtime: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub filename: String,
    pub preview: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub content: String,
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoFile {
    pub filename: String,
    pub items: Vec<TodoItem>,
}

/// A todo item tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoHit {
    #[serde(flatten)]
    pub item: TodoItem,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub team_name: String,
    pub task: TaskItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub joined_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub lead_agent_id: String,
    #[serde(default)]
    pub lead_session_id: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// A single debug-log line hit. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugMatch {
    pub file: String,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub session_id: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub file_mtime: i64,
    #[serde(default)]
    pub first_prompt: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub project_path: String,
    #[serde(default)]
    pub is_sidechain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsIndex {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<SessionEntry>,
    #[serde(default)]
    pub original_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub dir_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    pub session_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSessions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    pub sessions: Vec<SessionEntry>,
}

/// One day of activity. Only `date` is interpreted; the counters pass through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    #[serde(flatten)]
    pub counts: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyModelTokens {
    pub date: String,
    #[serde(flatten)]
    pub usage: Map<String, Value>,
}

/// Contents of `stats-cache.json`, computed by the assistant itself. Values
/// this crate never inspects are held as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCache {
    #[serde(default)]
    pub version: Value,
    #[serde(default)]
    pub last_computed_date: Value,
    #[serde(default)]
    pub daily_activity: Vec<DailyActivity>,
    #[serde(default)]
    pub daily_model_tokens: Vec<DailyModelTokens>,
    #[serde(default)]
    pub model_usage: Map<String, Value>,
    #[serde(default)]
    pub total_sessions: Value,
    #[serde(default)]
    pub total_messages: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longest_session: Option<Value>,
    #[serde(default)]
    pub first_session_date: Value,
    #[serde(default)]
    pub hour_counts: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_sessions: Value,
    pub total_messages: Value,
    pub first_session_date: Value,
    pub last_computed_date: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longest_session: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub summary: ActivitySummary,
}

/// `settings.json`, kept exactly as written. Accessors read the well-known
/// keys without constraining what the file may contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub Map<String, Value>);

impl Settings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn env(&self) -> Option<&Map<String, Value>> {
        self.get("env")?.as_object()
    }

    pub fn enabled_plugins(&self) -> Option<&Map<String, Value>> {
        self.get("enabledPlugins")?.as_object()
    }

    pub fn include_co_authored_by(&self) -> Option<bool> {
        self.get("includeCoAuthoredBy")?.as_bool()
    }

    pub fn teammate_mode(&self) -> Option<&str> {
        self.get("teammateMode")?.as_str()
    }
}

/// Sources that take part in cross-source search, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    History,
    Plans,
    Todos,
    Tasks,
    Debug,
    Projects,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::History,
        Source::Plans,
        Source::Todos,
        Source::Tasks,
        Source::Debug,
        Source::Projects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::History => "history",
            Source::Plans => "plans",
            Source::Todos => "todos",
            Source::Tasks => "tasks",
            Source::Debug => "debug",
            Source::Projects => "projects",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub source: Source,
    pub item: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_keep_unknown_keys() {
        let raw = json!({
            "env": { "FOO": "bar" },
            "enabledPlugins": { "lint@market": true },
            "theme": "dark",
            "permissions": { "allow": ["Bash"] }
        });
        let settings: Settings = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(settings.env().unwrap()["FOO"], "bar");
        assert_eq!(settings.enabled_plugins().unwrap()["lint@market"], true);
        assert_eq!(settings.get("theme"), Some(&json!("dark")));
        assert_eq!(serde_json::to_value(&settings).unwrap(), raw);
    }

    #[test]
    fn settings_accept_any_value_shapes() {
        let raw = json!({
            "env": { "MAX_THINKING_TOKENS": 8000, "DISABLE_TELEMETRY": true },
            "enabledPlugins": { "x@m": "yes" },
            "includeCoAuthoredBy": "sometimes",
            "statusLine": null
        });
        let settings: Settings = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(settings.env().unwrap()["MAX_THINKING_TOKENS"], 8000);
        assert_eq!(settings.include_co_authored_by(), None);
        assert_eq!(settings.get("statusLine"), Some(&Value::Null));
        assert_eq!(serde_json::to_value(&settings).unwrap(), raw);
    }

    #[test]
    fn todo_hit_flattens_item() {
        let hit = TodoHit {
            item: TodoItem {
                content: "write docs".into(),
                status: "pending".into(),
                priority: "high".into(),
                id: "1".into(),
                active_form: None,
            },
            filename: "abc.json".into(),
        };
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            json!({
                "content": "write docs",
                "status": "pending",
                "priority": "high",
                "id": "1",
                "filename": "abc.json"
            })
        );
    }

    #[test]
    fn source_names_parse() {
        assert_eq!("plans".parse::<Source>().unwrap(), Source::Plans);
        assert!("stats".parse::<Source>().is_err());
    }
}
