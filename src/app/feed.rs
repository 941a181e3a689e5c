use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::app::error::ActionError;
use crate::config::MAX_PAGE_SIZE;
use crate::domain::feed::{FeedCursor, FeedKey, FeedPage, InfiniteFeed};
use crate::domain::tweet::Tweet;
use crate::infra::cache::FeedCache;
use crate::infra::gateway::FeedSource;

#[derive(Debug, Clone, Copy, Default)]
struct FetchStatus {
    loading: bool,
    error: bool,
}

/// What a list renderer needs for one feed view.
#[derive(Debug, Clone)]
pub struct FeedState {
    pub key: FeedKey,
    pub tweets: Vec<Arc<Tweet>>,
    pub is_loading: bool,
    pub is_error: bool,
    pub has_more: bool,
}

/// Loads feed views into the shared cache and extends them page by page.
#[derive(Clone)]
pub struct FeedService {
    source: Arc<dyn FeedSource>,
    cache: Arc<dyn FeedCache>,
    page_size: usize,
    status: Arc<Mutex<HashMap<FeedKey, FetchStatus>>>,
}

impl FeedService {
    pub fn new(source: Arc<dyn FeedSource>, cache: Arc<dyn FeedCache>, page_size: usize) -> Self {
        Self {
            source,
            cache,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            status: Arc::default(),
        }
    }

    /// The cached view, or its first page fetched and cached.
    pub async fn load(&self, key: &FeedKey) -> Result<Arc<InfiniteFeed>, ActionError> {
        if let Some(feed) = self.cache.get(key).await {
            return Ok(feed);
        }
        self.refetch(key).await
    }

    /// Replaces the cached view with a fresh first page.
    pub async fn refetch(&self, key: &FeedKey) -> Result<Arc<InfiniteFeed>, ActionError> {
        let page = self.fetch(key, None).await?;
        let feed = InfiniteFeed::first(page);
        self.cache.set(key.clone(), feed.clone()).await;
        Ok(Arc::new(feed))
    }

    /// Appends the next page to the cached view. Resolves once the page is
    /// merged and reports whether more pages remain.
    pub async fn fetch_next_page(&self, key: &FeedKey) -> Result<bool, ActionError> {
        let Some(feed) = self.cache.get(key).await else {
            return self.refetch(key).await.map(|feed| feed.has_more());
        };
        let Some(cursor) = feed.next_cursor().cloned() else {
            return Ok(false);
        };

        let page = self.fetch(key, Some(&cursor)).await?;
        let merged = self
            .cache
            .set_with(key, &|old: Option<&InfiniteFeed>| {
                // A refetch or invalidation may have replaced the view meanwhile.
                let old = old?;
                if old.next_cursor() != Some(&cursor) {
                    return None;
                }
                Some(old.push_page(page.clone()))
            })
            .await;
        if !merged {
            tracing::debug!(feed = %key, "dropped page for a view that changed while loading");
        }

        Ok(self
            .cache
            .get(key)
            .await
            .map(|feed| feed.has_more())
            .unwrap_or(false))
    }

    pub async fn state(&self, key: &FeedKey) -> FeedState {
        let status = self.status_of(key);
        let feed = self.cache.get(key).await;

        FeedState {
            key: key.clone(),
            tweets: feed
                .as_ref()
                .map(|feed| feed.tweets().cloned().collect())
                .unwrap_or_default(),
            is_loading: status.loading,
            is_error: status.error,
            has_more: feed.map(|feed| feed.has_more()).unwrap_or(false),
        }
    }

    async fn fetch(&self, key: &FeedKey, cursor: Option<&FeedCursor>) -> Result<FeedPage, ActionError> {
        self.set_status(key, FetchStatus {
            loading: true,
            error: false,
        });

        match self.source.fetch_feed(key, cursor, self.page_size).await {
            Ok(page) => {
                self.set_status(key, FetchStatus::default());
                tracing::debug!(feed = %key, tweets = page.tweets.len(), has_more = page.next_cursor.is_some(), "fetched feed page");
                Ok(page)
            }
            Err(err) => {
                self.set_status(key, FetchStatus {
                    loading: false,
                    error: true,
                });
                tracing::warn!(error = ?err, feed = %key, "failed to fetch feed page");
                Err(ActionError::Fetch(err))
            }
        }
    }

    fn status_of(&self, key: &FeedKey) -> FetchStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    fn set_status(&self, key: &FeedKey, status: FetchStatus) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), status);
    }
}
