use anyhow::Result;
use async_trait::async_trait;

use crate::domain::engagement::{AssessmentToggled, LikeToggled};
use crate::domain::feed::{FeedCursor, FeedKey, FeedPage};

/// Serves paginated feeds. Implementations are scoped to one viewer, which
/// resolves `FeedKey::Following` and the per-viewer flags on each tweet.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(
        &self,
        key: &FeedKey,
        cursor: Option<&FeedCursor>,
        limit: usize,
    ) -> Result<FeedPage>;
}

/// Executes viewer actions against the remote system.
#[async_trait]
pub trait MutationGateway: Send + Sync {
    async fn toggle_like(&self, tweet_id: &str) -> Result<LikeToggled>;

    async fn toggle_assessment(&self, tweet_id: &str) -> Result<AssessmentToggled>;

    async fn delete_tweet(&self, tweet_id: &str) -> Result<()>;
}
