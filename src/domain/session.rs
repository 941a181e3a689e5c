use serde::{Deserialize, Serialize};

use crate::domain::tweet::Tweet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session provider: who is looking at the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub status: AuthStatus,
    pub viewer: Option<Viewer>,
}

impl Session {
    pub fn authenticated(viewer: Viewer) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            viewer: Some(viewer),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: AuthStatus::Unauthenticated,
            viewer: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated && self.viewer.is_some()
    }

    pub fn viewer_id(&self) -> Option<&str> {
        if !self.is_authenticated() {
            return None;
        }
        self.viewer.as_ref().map(|viewer| viewer.id.as_str())
    }

    /// Only the author may delete a tweet.
    pub fn can_delete(&self, tweet: &Tweet) -> bool {
        self.viewer_id()
            .map(|viewer_id| tweet.is_authored_by(viewer_id))
            .unwrap_or(false)
    }
}
