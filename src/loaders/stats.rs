use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{ActivityStats, ActivitySummary, StatsCache};
use crate::query::DateRange;
use crate::reader::FileReader;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Read-only view of `stats-cache.json`. Re-read on every call.
pub struct StatsLoader {
    path: PathBuf,
    reader: FileReader,
}

impl StatsLoader {
    pub fn new(path: PathBuf, reader: FileReader) -> Self {
        Self { path, reader }
    }

    /// `Ok(None)` until the assistant has written its first stats cache.
    pub async fn load(&self) -> Result<Option<StatsCache>> {
        self.reader.read_json_optional(&self.path).await
    }

    pub async fn activity(&self, query: &StatsQuery) -> Result<ActivityStats> {
        let Some(stats) = self.load().await? else {
            return Ok(ActivityStats::default());
        };
        let range = DateRange::new(query.start_date.as_deref(), query.end_date.as_deref());

        Ok(ActivityStats {
            daily_activity: stats
                .daily_activity
                .into_iter()
                .filter(|d| range.contains_date(&d.date))
                .collect(),
            daily_model_tokens: stats
                .daily_model_tokens
                .into_iter()
                .filter(|d| range.contains_date(&d.date))
                .collect(),
            summary: ActivitySummary {
                total_sessions: stats.total_sessions,
                total_messages: stats.total_messages,
                first_session_date: stats.first_session_date,
                last_computed_date: stats.last_computed_date,
                longest_session: stats.longest_session,
            },
        })
    }
}
