// src/state.rs

use crate::config::Config;
use crate::review::ReviewStore;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    /// In-memory review sessions and mastered-problem ignore sets.
    pub review: ReviewStore,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ReviewStore {
    fn from_ref(state: &AppState) -> Self {
        state.review.clone()
    }
}
