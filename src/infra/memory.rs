use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::engagement::{AssessmentToggled, LikeToggled};
use crate::domain::feed::{FeedCursor, FeedKey, FeedPage};
use crate::domain::tweet::{Author, Tweet};
use crate::infra::gateway::{FeedSource, MutationGateway};
use crate::infra::store::page_from;

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, Author>,
    tweets: Vec<StoredTweet>,
    likes: HashSet<(String, String)>,
    assessments: HashSet<(String, String)>,
    follows: HashSet<(String, String)>,
}

struct StoredTweet {
    id: String,
    author_id: String,
    content: String,
    created_at: OffsetDateTime,
}

/// In-process tweet store with the same feed and mutation semantics as the
/// Postgres store. Clones share data; each clone acts as one viewer.
#[derive(Clone, Default)]
pub struct MemoryTweetStore {
    state: Arc<RwLock<MemoryState>>,
    viewer_id: Option<String>,
}

impl MemoryTweetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_viewer(&self, viewer_id: Option<&str>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            viewer_id: viewer_id.map(str::to_string),
        }
    }

    fn require_viewer(&self) -> Result<&str> {
        self.viewer_id
            .as_deref()
            .ok_or_else(|| anyhow!("viewer is not signed in"))
    }

    pub async fn upsert_user(&self, id: &str, name: Option<&str>, image: Option<&str>) {
        let author = Author {
            id: id.to_string(),
            name: name.map(str::to_string),
            image: image.map(str::to_string),
        };
        self.state.write().await.users.insert(id.to_string(), author);
    }

    pub async fn follow(&self, following_id: &str) -> Result<()> {
        let viewer_id = self.require_viewer()?.to_string();
        self.state
            .write()
            .await
            .follows
            .insert((viewer_id, following_id.to_string()));
        Ok(())
    }

    pub async fn create_tweet(&self, content: &str) -> Result<Tweet> {
        self.create_tweet_at(content, OffsetDateTime::now_utc()).await
    }

    pub async fn create_tweet_at(&self, content: &str, created_at: OffsetDateTime) -> Result<Tweet> {
        self.insert_tweet(&Uuid::new_v4().to_string(), content, created_at)
            .await
    }

    /// Inserts a tweet with a caller-chosen id.
    pub async fn insert_tweet(
        &self,
        id: &str,
        content: &str,
        created_at: OffsetDateTime,
    ) -> Result<Tweet> {
        let viewer_id = self.require_viewer()?.to_string();
        let mut state = self.state.write().await;
        if !state.users.contains_key(&viewer_id) {
            return Err(anyhow!("unknown user: {}", viewer_id));
        }
        if state.tweets.iter().any(|tweet| tweet.id == id) {
            return Err(anyhow!("duplicate tweet id: {}", id));
        }
        state.tweets.push(StoredTweet {
            id: id.to_string(),
            author_id: viewer_id,
            content: content.to_string(),
            created_at,
        });
        let stored = state
            .tweets
            .last()
            .ok_or_else(|| anyhow!("tweet insert lost"))?;
        state.render(stored, self.viewer_id.as_deref())
    }

    /// Server-side view of a single tweet as this viewer sees it.
    pub async fn tweet(&self, tweet_id: &str) -> Result<Option<Tweet>> {
        let state = self.state.read().await;
        match state.tweets.iter().find(|tweet| tweet.id == tweet_id) {
            Some(stored) => state.render(stored, self.viewer_id.as_deref()).map(Some),
            None => Ok(None),
        }
    }
}

impl MemoryState {
    fn render(&self, stored: &StoredTweet, viewer_id: Option<&str>) -> Result<Tweet> {
        let author = self
            .users
            .get(&stored.author_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown author: {}", stored.author_id))?;
        let like_count = self
            .likes
            .iter()
            .filter(|(_, tweet_id)| *tweet_id == stored.id)
            .count() as i64;
        let marked = |set: &HashSet<(String, String)>| {
            viewer_id
                .map(|viewer| set.contains(&(viewer.to_string(), stored.id.clone())))
                .unwrap_or(false)
        };

        Ok(Tweet {
            id: stored.id.clone(),
            content: stored.content.clone(),
            created_at: stored.created_at,
            like_count,
            liked_by_me: marked(&self.likes),
            assessment: marked(&self.assessments),
            author,
        })
    }

    fn contains_tweet(&self, tweet_id: &str) -> bool {
        self.tweets.iter().any(|tweet| tweet.id == tweet_id)
    }
}

fn toggle_membership(set: &mut HashSet<(String, String)>, entry: (String, String)) -> bool {
    if set.remove(&entry) {
        false
    } else {
        set.insert(entry);
        true
    }
}

fn is_before(stored: &StoredTweet, cursor: &FeedCursor) -> bool {
    stored.created_at < cursor.created_at
        || (stored.created_at == cursor.created_at && stored.id < cursor.id)
}

#[async_trait]
impl FeedSource for MemoryTweetStore {
    async fn fetch_feed(
        &self,
        key: &FeedKey,
        cursor: Option<&FeedCursor>,
        limit: usize,
    ) -> Result<FeedPage> {
        let state = self.state.read().await;
        let followed: HashSet<&str> = match key {
            FeedKey::Following => {
                let viewer_id = self.require_viewer()?;
                state
                    .follows
                    .iter()
                    .filter(|(follower, _)| follower == viewer_id)
                    .map(|(_, following)| following.as_str())
                    .collect()
            }
            _ => HashSet::new(),
        };

        let mut matching: Vec<&StoredTweet> = state
            .tweets
            .iter()
            .filter(|stored| match key {
                FeedKey::All => true,
                FeedKey::Following => followed.contains(stored.author_id.as_str()),
                FeedKey::Profile { user_id } => stored.author_id == *user_id,
            })
            .filter(|stored| cursor.map_or(true, |cursor| is_before(stored, cursor)))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let fetch = limit.saturating_add(1);
        let mut tweets = Vec::with_capacity(fetch.min(matching.len()));
        for stored in matching.into_iter().take(fetch) {
            tweets.push(state.render(stored, self.viewer_id.as_deref())?);
        }

        Ok(page_from(tweets, limit))
    }
}

#[async_trait]
impl MutationGateway for MemoryTweetStore {
    async fn toggle_like(&self, tweet_id: &str) -> Result<LikeToggled> {
        let viewer_id = self.require_viewer()?.to_string();
        let mut state = self.state.write().await;
        if !state.contains_tweet(tweet_id) {
            return Err(anyhow!("tweet not found"));
        }
        let added_like = toggle_membership(&mut state.likes, (viewer_id, tweet_id.to_string()));
        Ok(LikeToggled { added_like })
    }

    async fn toggle_assessment(&self, tweet_id: &str) -> Result<AssessmentToggled> {
        let viewer_id = self.require_viewer()?.to_string();
        let mut state = self.state.write().await;
        if !state.contains_tweet(tweet_id) {
            return Err(anyhow!("tweet not found"));
        }
        let added_assessment =
            toggle_membership(&mut state.assessments, (viewer_id, tweet_id.to_string()));
        Ok(AssessmentToggled { added_assessment })
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<()> {
        let viewer_id = self.require_viewer()?;
        let mut state = self.state.write().await;
        let before = state.tweets.len();
        state
            .tweets
            .retain(|tweet| !(tweet.id == tweet_id && tweet.author_id == viewer_id));
        if state.tweets.len() == before {
            return Err(anyhow!("tweet not found or not owned by viewer"));
        }
        state.likes.retain(|(_, liked)| liked != tweet_id);
        state.assessments.retain(|(_, assessed)| assessed != tweet_id);
        Ok(())
    }
}
