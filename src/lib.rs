pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use anyhow::Result;

use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::list::{DateLabeler, TweetList};
use crate::config::FeedSettings;
use crate::domain::feed::FeedKey;
use crate::domain::session::Session;
use crate::infra::cache::{FeedCache, MemoryFeedCache};
use crate::infra::gateway::{FeedSource, MutationGateway};

/// Everything one mounted feed UI talks to, sharing a single cache.
#[derive(Clone)]
pub struct FeedClient {
    pub cache: Arc<dyn FeedCache>,
    pub feeds: FeedService,
    pub engagement: EngagementService,
    pub dates: DateLabeler,
}

impl FeedClient {
    pub fn new<B>(backend: Arc<B>, session: Session, settings: &FeedSettings) -> Result<Self>
    where
        B: FeedSource + MutationGateway + 'static,
    {
        let cache: Arc<dyn FeedCache> = Arc::new(MemoryFeedCache::new());
        Self::with_cache(backend, cache, session, settings)
    }

    pub fn with_cache<B>(
        backend: Arc<B>,
        cache: Arc<dyn FeedCache>,
        session: Session,
        settings: &FeedSettings,
    ) -> Result<Self>
    where
        B: FeedSource + MutationGateway + 'static,
    {
        let source: Arc<dyn FeedSource> = backend.clone();
        let gateway: Arc<dyn MutationGateway> = backend;
        Ok(Self {
            feeds: FeedService::new(source, Arc::clone(&cache), settings.page_size),
            engagement: EngagementService::new(gateway, Arc::clone(&cache), session, settings),
            dates: DateLabeler::from_settings(settings)?,
            cache,
        })
    }

    /// Render model for `key` from whatever is cached right now.
    pub async fn list(&self, key: &FeedKey) -> TweetList {
        let state = self.feeds.state(key).await;
        TweetList::build(&state, &self.engagement, &self.dates)
    }
}
