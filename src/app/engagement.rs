use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::app::error::ActionError;
use crate::app::optimistic::{
    affected_views, apply_toggle, patch_views, remove_tweet, TogglePatch,
};
use crate::config::FeedSettings;
use crate::domain::engagement::{
    AssessmentPolicy, DeleteStrategy, ToggleKind, ToggleOutcome, UpdateStrategy,
};
use crate::domain::session::Session;
use crate::domain::tweet::Tweet;
use crate::infra::cache::FeedCache;
use crate::infra::gateway::MutationGateway;

/// In-flight toggle count per tweet and kind.
type PendingSet = Arc<Mutex<HashMap<(String, ToggleKind), usize>>>;

/// Viewer actions on a single tweet, each followed by a patch of the cached
/// feed views that may hold it.
#[derive(Clone)]
pub struct EngagementService {
    gateway: Arc<dyn MutationGateway>,
    cache: Arc<dyn FeedCache>,
    session: Session,
    update_strategy: UpdateStrategy,
    assessment_policy: AssessmentPolicy,
    delete_strategy: DeleteStrategy,
    pending: PendingSet,
}

impl EngagementService {
    pub fn new(
        gateway: Arc<dyn MutationGateway>,
        cache: Arc<dyn FeedCache>,
        session: Session,
        settings: &FeedSettings,
    ) -> Self {
        Self {
            gateway,
            cache,
            session,
            update_strategy: settings.update_strategy,
            assessment_policy: settings.assessment_policy,
            delete_strategy: settings.delete_strategy,
            pending: PendingSet::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True while a toggle of `kind` on `tweet_id` is waiting on the gateway.
    /// Callers disable the matching control while this holds.
    pub fn is_pending(&self, tweet_id: &str, kind: ToggleKind) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(tweet_id.to_string(), kind))
    }

    pub async fn toggle_like(&self, tweet: &Tweet) -> Result<ToggleOutcome, ActionError> {
        self.toggle(tweet, ToggleKind::Like).await
    }

    pub async fn toggle_assessment(&self, tweet: &Tweet) -> Result<ToggleOutcome, ActionError> {
        self.toggle(tweet, ToggleKind::Assessment).await
    }

    pub async fn delete_tweet(&self, tweet: &Tweet) -> Result<(), ActionError> {
        if !self.session.is_authenticated() {
            return Err(ActionError::Unauthenticated);
        }
        if !self.session.can_delete(tweet) {
            return Err(ActionError::NotAuthor);
        }

        self.gateway.delete_tweet(&tweet.id).await.map_err(|err| {
            tracing::warn!(error = ?err, tweet_id = %tweet.id, "failed to delete tweet");
            ActionError::Gateway(err)
        })?;

        match self.delete_strategy {
            DeleteStrategy::Evict => {
                let tweet_id = tweet.id.as_str();
                patch_views(self.cache.as_ref(), &tweet.author.id, |old| {
                    remove_tweet(old, tweet_id)
                })
                .await;
            }
            DeleteStrategy::Reload => {
                self.cache.clear().await;
                tracing::info!(tweet_id = %tweet.id, "cleared cached feeds after delete");
            }
        }

        Ok(())
    }

    async fn toggle(&self, tweet: &Tweet, kind: ToggleKind) -> Result<ToggleOutcome, ActionError> {
        if !self.session.is_authenticated() {
            return Err(ActionError::Unauthenticated);
        }
        let _pending = PendingGuard::enter(&self.pending, &tweet.id, kind);

        let toggled_on = match self.update_strategy {
            UpdateStrategy::ConfirmThenPatch => {
                let toggled_on = self.send_toggle(&tweet.id, kind).await?;
                self.patch(tweet, kind, toggled_on).await;
                toggled_on
            }
            UpdateStrategy::PatchThenConfirm => {
                let predicted = !self.cached_flag(tweet, kind).await;
                self.patch(tweet, kind, predicted).await;
                match self.send_toggle(&tweet.id, kind).await {
                    Ok(toggled_on) => {
                        if toggled_on != predicted {
                            // Undo the guess, then land the server's answer.
                            self.patch(tweet, kind, !predicted).await;
                            self.patch(tweet, kind, toggled_on).await;
                        }
                        toggled_on
                    }
                    Err(err) => {
                        self.patch(tweet, kind, !predicted).await;
                        return Err(err);
                    }
                }
            }
        };

        Ok(ToggleOutcome {
            tweet_id: tweet.id.clone(),
            kind,
            toggled_on,
        })
    }

    async fn send_toggle(&self, tweet_id: &str, kind: ToggleKind) -> Result<bool, ActionError> {
        let result = match kind {
            ToggleKind::Like => self
                .gateway
                .toggle_like(tweet_id)
                .await
                .map(|reply| reply.added_like),
            ToggleKind::Assessment => self
                .gateway
                .toggle_assessment(tweet_id)
                .await
                .map(|reply| reply.added_assessment),
        };

        result.map_err(|err| {
            tracing::warn!(error = ?err, tweet_id = %tweet_id, kind = %kind, "toggle rejected");
            ActionError::Gateway(err)
        })
    }

    async fn patch(&self, tweet: &Tweet, kind: ToggleKind, toggled_on: bool) {
        let patch = match kind {
            ToggleKind::Like => TogglePatch::like(tweet.id.as_str(), toggled_on),
            ToggleKind::Assessment => {
                TogglePatch::assessment(tweet.id.as_str(), toggled_on, self.assessment_policy)
            }
        };
        patch_views(self.cache.as_ref(), &tweet.author.id, |old| {
            apply_toggle(old, &patch)
        })
        .await;
    }

    /// The flag as the cache holds it now. The caller's copy may predate
    /// an earlier toggle that already landed.
    async fn cached_flag(&self, tweet: &Tweet, kind: ToggleKind) -> bool {
        for key in affected_views(&tweet.author.id) {
            if let Some(feed) = self.cache.get(&key).await {
                if let Some(cached) = feed.find(&tweet.id) {
                    return current_flag(cached, kind);
                }
            }
        }
        current_flag(tweet, kind)
    }
}

fn current_flag(tweet: &Tweet, kind: ToggleKind) -> bool {
    match kind {
        ToggleKind::Like => tweet.liked_by_me,
        ToggleKind::Assessment => tweet.assessment,
    }
}

struct PendingGuard {
    pending: PendingSet,
    entry: (String, ToggleKind),
}

impl PendingGuard {
    fn enter(pending: &PendingSet, tweet_id: &str, kind: ToggleKind) -> Self {
        let entry = (tweet_id.to_string(), kind);
        *pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entry.clone())
            .or_insert(0) += 1;
        Self {
            pending: Arc::clone(pending),
            entry,
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = pending.get_mut(&self.entry) {
            *count -= 1;
            if *count == 0 {
                pending.remove(&self.entry);
            }
        }
    }
}
