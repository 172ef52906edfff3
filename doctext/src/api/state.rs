use std::sync::Arc;

use crate::config::Config;
use crate::processing::ContentExtractor;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<ContentExtractor>,
}

impl AppState {
    pub fn new(config: Config, extractor: ContentExtractor) -> Self {
        Self {
            config: Arc::new(config),
            extractor: Arc::new(extractor),
        }
    }
}
