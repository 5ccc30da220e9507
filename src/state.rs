//! Application state management

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;

/// Shared application state
///
/// Holds only read-only configuration; every request works on its own
/// buffers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                started_at: Instant::now(),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }
}
