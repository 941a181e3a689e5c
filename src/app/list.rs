use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use time::format_description::{self, OwnedFormatItem};
use time::UtcOffset;

use crate::app::engagement::EngagementService;
use crate::app::feed::FeedState;
use crate::config::FeedSettings;
use crate::domain::engagement::ToggleKind;
use crate::domain::tweet::Tweet;

/// Formats tweet timestamps for the viewer.
#[derive(Debug, Clone)]
pub struct DateLabeler {
    format: OwnedFormatItem,
    offset: UtcOffset,
}

impl DateLabeler {
    pub fn new(format: &str, offset: UtcOffset) -> Result<Self> {
        let format = format_description::parse_owned::<1>(format)
            .map_err(|err| anyhow!("invalid date format: {}", err))?;
        Ok(Self { format, offset })
    }

    pub fn from_settings(settings: &FeedSettings) -> Result<Self> {
        Self::new(&settings.date_format, settings.display_offset)
    }

    pub fn label(&self, tweet: &Tweet) -> String {
        tweet
            .created_at
            .to_offset(self.offset)
            .format(&self.format)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartButton {
    /// Anonymous viewers see the count without a clickable control.
    pub interactive: bool,
    pub disabled: bool,
    pub filled: bool,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentButton {
    pub on: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TweetCard {
    pub tweet: Arc<Tweet>,
    pub date_label: String,
    pub show_delete: bool,
    pub heart: HeartButton,
    pub assessment: AssessmentButton,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TweetList {
    Error,
    Empty,
    Tweets {
        cards: Vec<TweetCard>,
        has_more: bool,
        loading_more: bool,
    },
}

impl TweetList {
    pub fn build(state: &FeedState, engagement: &EngagementService, dates: &DateLabeler) -> Self {
        if state.is_error {
            return Self::Error;
        }
        if state.tweets.is_empty() {
            return Self::Empty;
        }

        let session = engagement.session();
        let authenticated = session.is_authenticated();
        let cards = state
            .tweets
            .iter()
            .map(|tweet| TweetCard {
                date_label: dates.label(tweet),
                show_delete: session.can_delete(tweet),
                heart: HeartButton {
                    interactive: authenticated,
                    disabled: engagement.is_pending(&tweet.id, ToggleKind::Like),
                    filled: tweet.liked_by_me,
                    count: tweet.like_count,
                },
                assessment: AssessmentButton {
                    on: tweet.assessment,
                    disabled: !authenticated
                        || engagement.is_pending(&tweet.id, ToggleKind::Assessment),
                },
                tweet: Arc::clone(tweet),
            })
            .collect();

        Self::Tweets {
            cards,
            has_more: state.has_more,
            loading_more: state.is_loading,
        }
    }

    pub fn cards(&self) -> &[TweetCard] {
        match self {
            Self::Tweets { cards, .. } => cards,
            _ => &[],
        }
    }
}
