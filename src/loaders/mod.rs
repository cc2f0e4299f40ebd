//! One loader per data source. Each owns its cache and answers filtered queries.

pub mod debug;
pub mod history;
pub mod plans;
pub mod projects;
pub mod settings;
pub mod stats;
pub mod tasks;
pub mod teams;
pub mod todos;

pub use debug::{DebugLogSearch, DebugQuery};
pub use history::{HistoryLoader, HistoryQuery};
pub use plans::{PlanLoader, PlanQuery};
pub use projects::{ProjectLoader, ProjectSessionsQuery};
pub use settings::SettingsLoader;
pub use stats::{StatsLoader, StatsQuery};
pub use tasks::{TaskLoader, TaskQuery};
pub use teams::TeamLoader;
pub use todos::{TodoLoader, TodoQuery};
