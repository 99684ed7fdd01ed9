use crate::types::{MediaRequest, Result};
use async_trait::async_trait;
use url::Url;

/// Trait for the remote cat API the orchestrator talks to
#[async_trait]
pub trait CatService: Send + Sync {
    /// Build a cache-busting GIF URL for the request. No network I/O.
    fn build_gif_url(&self, request: &MediaRequest) -> Url;

    /// Fetch the tag catalog, trimmed and sorted for display
    async fn list_tags(&self) -> Result<Vec<String>>;
}

/// Source of uniform values in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Default randomness backed by the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}
