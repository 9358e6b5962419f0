use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::state::library::Library;

/// Shared handler state
pub struct AppState {
    pub config: Config,
    /// One connection; each handler holds the lock for a single query
    pub library: Mutex<Library>,
}

impl AppState {
    pub fn new(config: Config, library: Library) -> Arc<Self> {
        Arc::new(Self {
            config,
            library: Mutex::new(library),
        })
    }
}
