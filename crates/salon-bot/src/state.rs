//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use dialog::Stats;

use crate::metrics::Metrics;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Transport and dispatcher counters.
    pub metrics: Arc<Metrics>,
    /// Controller counters.
    pub stats: Arc<Stats>,
}

impl AppState {
    pub fn new(db: Database, metrics: Arc<Metrics>, stats: Arc<Stats>) -> Self {
        Self { db, metrics, stats }
    }
}
