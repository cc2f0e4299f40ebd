//! Read-only query tools over a coding assistant's local data directory.
//!
//! Loaders parse history, plans, todos, tasks, teams, debug logs, project
//! session indexes, stats and settings lazily and cache them by file mtime.
//! [`search::SearchEngine`] exposes one operation per tool and a concurrent
//! cross-source search; [`mcp`] serves those operations over stdio.

pub mod cache;
pub mod config;
pub mod error;
pub mod loaders;
pub mod mcp;
pub mod model;
pub mod pagination;
pub mod paths;
pub mod query;
pub mod reader;
pub mod scanner;
pub mod search;

pub use error::{HistoryError, Result};
pub use paths::DataPaths;
pub use search::{SearchAllQuery, SearchEngine};
