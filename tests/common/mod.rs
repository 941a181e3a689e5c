#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Notify;

use tweetline::config::FeedSettings;
use tweetline::domain::engagement::{AssessmentToggled, LikeToggled};
use tweetline::domain::feed::{FeedCursor, FeedKey, FeedPage, InfiniteFeed};
use tweetline::domain::session::{Session, Viewer};
use tweetline::domain::tweet::{Author, Tweet};
use tweetline::infra::gateway::{FeedSource, MutationGateway};
use tweetline::infra::memory::MemoryTweetStore;
use tweetline::FeedClient;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const VIEWER: &str = "viewer";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const FANS: [&str; 4] = ["fan_1", "fan_2", "fan_3", "fan_4"];

/// 2023-11-14T22:13:20Z
pub const BASE_TIMESTAMP: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Plain value builders
// ---------------------------------------------------------------------------

pub fn at(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(BASE_TIMESTAMP + seconds).expect("valid timestamp")
}

pub fn tweet(id: &str, author_id: &str, like_count: i64, liked_by_me: bool) -> Tweet {
    Tweet {
        id: id.to_string(),
        content: format!("content of {}", id),
        created_at: at(0),
        like_count,
        liked_by_me,
        assessment: false,
        author: Author {
            id: author_id.to_string(),
            name: Some(author_id.to_string()),
            image: None,
        },
    }
}

pub fn page(tweets: Vec<Tweet>) -> FeedPage {
    let next_cursor = tweets.last().map(FeedCursor::after);
    FeedPage {
        tweets: tweets.into_iter().map(Arc::new).collect(),
        next_cursor,
    }
}

pub fn feed(pages: Vec<Vec<Tweet>>) -> InfiniteFeed {
    InfiniteFeed {
        pages: pages.into_iter().map(|tweets| Arc::new(page(tweets))).collect(),
    }
}

pub fn viewer_session() -> Session {
    Session::authenticated(Viewer {
        id: VIEWER.to_string(),
        name: Some("Viewer".to_string()),
    })
}

pub fn find(feed: &InfiniteFeed, tweet_id: &str) -> Arc<Tweet> {
    feed.find(tweet_id)
        .cloned()
        .unwrap_or_else(|| panic!("tweet {} not in feed", tweet_id))
}

/// `find` over a view handed out by the cache.
pub fn find_cached(feed: &Arc<InfiniteFeed>, tweet_id: &str) -> Arc<Tweet> {
    find(feed.as_ref(), tweet_id)
}

// ---------------------------------------------------------------------------
// Seeded store
// ---------------------------------------------------------------------------

/// Viewer follows alice. Tweets, newest first:
/// - `t1` by alice, liked by four fans
/// - `t2` by bob
/// - `t3` by the viewer
pub async fn seeded_store() -> MemoryTweetStore {
    let root = MemoryTweetStore::new();
    root.upsert_user(VIEWER, Some("Viewer"), None).await;
    root.upsert_user(ALICE, Some("Alice"), Some("avatars/alice.png"))
        .await;
    root.upsert_user(BOB, Some("Bob"), None).await;
    for fan in FANS {
        root.upsert_user(fan, None, None).await;
    }

    root.for_viewer(Some(VIEWER))
        .follow(ALICE)
        .await
        .expect("follow alice");

    root.for_viewer(Some(ALICE))
        .insert_tweet("t1", "hello\n  world", at(30))
        .await
        .expect("insert t1");
    root.for_viewer(Some(BOB))
        .insert_tweet("t2", "second", at(20))
        .await
        .expect("insert t2");
    root.for_viewer(Some(VIEWER))
        .insert_tweet("t3", "mine", at(10))
        .await
        .expect("insert t3");

    for fan in FANS {
        root.for_viewer(Some(fan))
            .toggle_like("t1")
            .await
            .expect("fan like");
    }

    root
}

// ---------------------------------------------------------------------------
// Backend wrapper with failure injection
// ---------------------------------------------------------------------------

pub struct FlakyBackend {
    inner: MemoryTweetStore,
    fail_mutations: AtomicBool,
    fail_fetches: AtomicBool,
    mutation_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
    fetch_gate: Mutex<Option<Arc<Notify>>>,
}

impl FlakyBackend {
    pub fn new(inner: MemoryTweetStore) -> Self {
        Self {
            inner,
            fail_mutations: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            mutation_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
            fetch_gate: Mutex::new(None),
        }
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Makes every mutation wait until the returned handle is notified.
    pub fn hold_mutations(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// Makes fetches started from now on wait until the returned handle is
    /// notified.
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.fetch_gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// Lets later fetches through; fetches already waiting stay held.
    pub fn open_fetches(&self) {
        *self.fetch_gate.lock().unwrap() = None;
    }

    async fn before_mutation(&self) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(anyhow!("gateway unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for FlakyBackend {
    async fn fetch_feed(
        &self,
        key: &FeedKey,
        cursor: Option<&FeedCursor>,
        limit: usize,
    ) -> Result<FeedPage> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(anyhow!("feed source unavailable"));
        }
        self.inner.fetch_feed(key, cursor, limit).await
    }
}

#[async_trait]
impl MutationGateway for FlakyBackend {
    async fn toggle_like(&self, tweet_id: &str) -> Result<LikeToggled> {
        self.before_mutation().await?;
        self.inner.toggle_like(tweet_id).await
    }

    async fn toggle_assessment(&self, tweet_id: &str) -> Result<AssessmentToggled> {
        self.before_mutation().await?;
        self.inner.toggle_assessment(tweet_id).await
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<()> {
        self.before_mutation().await?;
        self.inner.delete_tweet(tweet_id).await
    }
}

// ---------------------------------------------------------------------------
// Client harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: MemoryTweetStore,
    pub backend: Arc<FlakyBackend>,
    pub client: FeedClient,
}

pub async fn harness(session: Session, settings: FeedSettings) -> Harness {
    let store = seeded_store().await;
    let viewer_id = session.viewer_id().map(str::to_string);
    let backend = Arc::new(FlakyBackend::new(store.for_viewer(viewer_id.as_deref())));
    let client = FeedClient::new(Arc::clone(&backend), session, &settings).expect("client");
    Harness {
        store,
        backend,
        client,
    }
}

impl Harness {
    pub async fn cached(&self, key: &FeedKey) -> Arc<InfiniteFeed> {
        self.client
            .cache
            .get(key)
            .await
            .unwrap_or_else(|| panic!("{} not cached", key))
    }

    pub async fn load_all_views(&self) {
        for key in [FeedKey::All, FeedKey::Following, FeedKey::profile(ALICE)] {
            self.client.feeds.load(&key).await.expect("load view");
        }
    }
}
