use crate::config::Config;
use crate::repository::BookRepositoryArc;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub books: BookRepositoryArc,
    pub config: Arc<Config>,
}
