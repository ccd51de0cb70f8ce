use std::sync::Arc;

use crate::cache::RefreshableCache;
use crate::services::NetworkPolicy;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: RefreshableCache,
    pub policy: Arc<NetworkPolicy>,
}

impl AppState {
    pub fn new(cache: RefreshableCache, policy: NetworkPolicy) -> Self {
        Self {
            cache,
            policy: Arc::new(policy),
        }
    }
}
