use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::tweet::Tweet;

/// Names a cached feed view and doubles as the filter sent to the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedKey {
    All,
    Following,
    Profile { user_id: String },
}

impl FeedKey {
    pub fn profile(user_id: impl Into<String>) -> Self {
        Self::Profile {
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("feed:all"),
            Self::Following => f.write_str("feed:following"),
            Self::Profile { user_id } => write!(f, "feed:profile:{}", user_id),
        }
    }
}

/// Position of the last tweet of a page. The next page starts strictly after it
/// in `created_at DESC, id DESC` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCursor {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub id: String,
}

impl FeedCursor {
    pub fn after(tweet: &Tweet) -> Self {
        Self {
            created_at: tweet.created_at,
            id: tweet.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub tweets: Vec<Arc<Tweet>>,
    pub next_cursor: Option<FeedCursor>,
}

impl FeedPage {
    pub fn contains(&self, tweet_id: &str) -> bool {
        self.tweets.iter().any(|tweet| tweet.id == tweet_id)
    }
}

/// All pages fetched so far for one feed view, oldest fetch last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfiniteFeed {
    pub pages: Vec<Arc<FeedPage>>,
}

impl InfiniteFeed {
    pub fn first(page: FeedPage) -> Self {
        Self {
            pages: vec![Arc::new(page)],
        }
    }

    pub fn push_page(&self, page: FeedPage) -> Self {
        let mut pages = self.pages.clone();
        pages.push(Arc::new(page));
        Self { pages }
    }

    pub fn next_cursor(&self) -> Option<&FeedCursor> {
        self.pages.last().and_then(|page| page.next_cursor.as_ref())
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some()
    }

    pub fn tweets(&self) -> impl Iterator<Item = &Arc<Tweet>> {
        self.pages.iter().flat_map(|page| page.tweets.iter())
    }

    pub fn find(&self, tweet_id: &str) -> Option<&Arc<Tweet>> {
        self.tweets().find(|tweet| tweet.id == tweet_id)
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.tweets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
