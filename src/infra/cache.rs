use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::feed::{FeedKey, InfiniteFeed};

/// Read-and-replace access to cached feed views.
#[async_trait]
pub trait FeedCache: Send + Sync {
    async fn get(&self, key: &FeedKey) -> Option<Arc<InfiniteFeed>>;

    async fn set(&self, key: FeedKey, feed: InfiniteFeed);

    /// Runs `updater` on the current snapshot and stores what it returns.
    /// Returning `None` leaves the entry as it was. Reports whether a write
    /// happened.
    async fn set_with(
        &self,
        key: &FeedKey,
        updater: &(dyn for<'a> Fn(Option<&'a InfiniteFeed>) -> Option<InfiniteFeed> + Send + Sync),
    ) -> bool;

    async fn invalidate(&self, key: &FeedKey);

    async fn clear(&self);

    async fn keys(&self) -> Vec<FeedKey>;
}

#[derive(Clone, Default)]
pub struct MemoryFeedCache {
    views: Arc<RwLock<HashMap<FeedKey, Arc<InfiniteFeed>>>>,
}

impl MemoryFeedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedCache for MemoryFeedCache {
    async fn get(&self, key: &FeedKey) -> Option<Arc<InfiniteFeed>> {
        self.views.read().await.get(key).cloned()
    }

    async fn set(&self, key: FeedKey, feed: InfiniteFeed) {
        self.views.write().await.insert(key, Arc::new(feed));
    }

    async fn set_with(
        &self,
        key: &FeedKey,
        updater: &(dyn for<'a> Fn(Option<&'a InfiniteFeed>) -> Option<InfiniteFeed> + Send + Sync),
    ) -> bool {
        let mut views = self.views.write().await;
        let current = views.get(key).map(|feed| feed.as_ref());
        match updater(current) {
            Some(next) => {
                views.insert(key.clone(), Arc::new(next));
                true
            }
            None => false,
        }
    }

    async fn invalidate(&self, key: &FeedKey) {
        self.views.write().await.remove(key);
    }

    async fn clear(&self) {
        self.views.write().await.clear();
    }

    async fn keys(&self) -> Vec<FeedKey> {
        self.views.read().await.keys().cloned().collect()
    }
}
