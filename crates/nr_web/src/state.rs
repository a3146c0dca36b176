use std::sync::Arc;
use nr_providers::SearchManager;

pub struct AppState {
    pub manager: Arc<SearchManager>,
}

impl AppState {
    pub fn new(manager: Arc<SearchManager>) -> Self {
        Self { manager }
    }
}
