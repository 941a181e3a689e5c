//! Cache patches applied to every feed view that may hold a toggled or deleted
//! tweet.
//!
//! The update functions are pure: they take the old snapshot and return the
//! next one. Pages and tweets that do not change keep their `Arc`, so a
//! renderer can skip them with `Arc::ptr_eq`. `patch_views` is the only place
//! that writes to a store.

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::engagement::{AssessmentPolicy, ToggleKind};
use crate::domain::feed::{FeedKey, FeedPage, InfiniteFeed};
use crate::domain::tweet::Tweet;
use crate::infra::cache::FeedCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePatch {
    pub tweet_id: String,
    pub kind: ToggleKind,
    pub toggled_on: bool,
    pub policy: AssessmentPolicy,
}

impl TogglePatch {
    pub fn like(tweet_id: impl Into<String>, toggled_on: bool) -> Self {
        Self {
            tweet_id: tweet_id.into(),
            kind: ToggleKind::Like,
            toggled_on,
            policy: AssessmentPolicy::default(),
        }
    }

    pub fn assessment(
        tweet_id: impl Into<String>,
        toggled_on: bool,
        policy: AssessmentPolicy,
    ) -> Self {
        Self {
            tweet_id: tweet_id.into(),
            kind: ToggleKind::Assessment,
            toggled_on,
            policy,
        }
    }

    /// The same patch with the flag flipped, used to undo it.
    pub fn inverse(&self) -> Self {
        Self {
            toggled_on: !self.toggled_on,
            ..self.clone()
        }
    }

    fn adjusts_likes(&self) -> bool {
        match self.kind {
            ToggleKind::Like => true,
            ToggleKind::Assessment => self.policy == AssessmentPolicy::MirrorLike,
        }
    }
}

/// The views a tweet by `author_id` can appear in.
pub fn affected_views(author_id: &str) -> [FeedKey; 3] {
    [FeedKey::All, FeedKey::Following, FeedKey::profile(author_id)]
}

/// Applies the toggle to one tweet. The count moves by one in the direction of
/// `toggled_on` with no clamping; a refetch brings the server's value back.
pub fn toggle_tweet(tweet: &Tweet, patch: &TogglePatch) -> Tweet {
    let mut next = tweet.clone();
    if patch.adjusts_likes() {
        next.like_count += if patch.toggled_on { 1 } else { -1 };
        next.liked_by_me = patch.toggled_on;
    }
    if patch.kind == ToggleKind::Assessment {
        next.assessment = patch.toggled_on;
    }
    next
}

/// Replaces every cached copy of `patch.tweet_id`. Returns `None` when the
/// view is not cached or does not hold the tweet.
pub fn apply_toggle(old: Option<&InfiniteFeed>, patch: &TogglePatch) -> Option<InfiniteFeed> {
    map_tweet(old, &patch.tweet_id, |tweet| Some(toggle_tweet(tweet, patch)))
}

/// Drops every cached copy of `tweet_id`. Returns `None` when the view is
/// not cached or does not hold the tweet.
pub fn remove_tweet(old: Option<&InfiniteFeed>, tweet_id: &str) -> Option<InfiniteFeed> {
    map_tweet(old, tweet_id, |_| None)
}

fn map_tweet<F>(old: Option<&InfiniteFeed>, tweet_id: &str, replace: F) -> Option<InfiniteFeed>
where
    F: Fn(&Tweet) -> Option<Tweet>,
{
    let old = old?;
    if !old.pages.iter().any(|page| page.contains(tweet_id)) {
        return None;
    }
    let pages = old
        .pages
        .iter()
        .map(|page| {
            if !page.contains(tweet_id) {
                return Arc::clone(page);
            }
            let tweets = page
                .tweets
                .iter()
                .filter_map(|tweet| {
                    if tweet.id == tweet_id {
                        replace(tweet).map(Arc::new)
                    } else {
                        Some(Arc::clone(tweet))
                    }
                })
                .collect();
            Arc::new(FeedPage {
                tweets,
                next_cursor: page.next_cursor.clone(),
            })
        })
        .collect();

    Some(InfiniteFeed { pages })
}

/// Writes `update` into each view affected by a tweet of `author_id`. Views
/// that are not cached or lack the tweet are skipped. Returns how many views
/// were written.
pub async fn patch_views<F>(cache: &dyn FeedCache, author_id: &str, update: F) -> usize
where
    F: Fn(Option<&InfiniteFeed>) -> Option<InfiniteFeed> + Send + Sync,
{
    let views = affected_views(author_id);
    let written = join_all(views.iter().map(|key| cache.set_with(key, &update))).await;

    let count = written.into_iter().filter(|written| *written).count();
    tracing::debug!(author_id = %author_id, views = count, "patched cached feed views");
    count
}
