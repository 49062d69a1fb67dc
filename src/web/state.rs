use std::sync::Arc;

use crate::ai::ContentGenerator;
use crate::cache::ArticleCache;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: ArticleCache,
    /// `None` when no API key is configured.
    pub generator: Option<Arc<dyn ContentGenerator>>,
    pub recent_limit: usize,
    pub generate_images: bool,
}

impl AppState {
    pub fn new(cache: ArticleCache, generator: Option<Arc<dyn ContentGenerator>>) -> Self {
        Self {
            cache,
            generator,
            recent_limit: 5,
            generate_images: true,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn with_image_generation(mut self, enabled: bool) -> Self {
        self.generate_images = enabled;
        self
    }
}
