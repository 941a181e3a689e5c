use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    Like,
    Assessment,
}

impl fmt::Display for ToggleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Assessment => f.write_str("assessment"),
        }
    }
}

/// Gateway reply for a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggled {
    pub added_like: bool,
}

/// Gateway reply for an assessment toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentToggled {
    pub added_assessment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub tweet_id: String,
    pub kind: ToggleKind,
    pub toggled_on: bool,
}

/// What an assessment toggle does to the like fields of a cached tweet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssessmentPolicy {
    /// Only the `assessment` flag changes.
    #[default]
    Independent,
    /// The assessment also drives `liked_by_me` and `like_count`.
    MirrorLike,
}

impl FromStr for AssessmentPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "independent" => Ok(Self::Independent),
            "mirror_like" => Ok(Self::MirrorLike),
            other => Err(anyhow!("unknown assessment policy: {}", other)),
        }
    }
}

/// When a toggle is written into the cached views relative to the remote call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Patch after the gateway acknowledged the toggle.
    #[default]
    ConfirmThenPatch,
    /// Patch with the predicted value first, roll back if the gateway fails.
    PatchThenConfirm,
}

impl FromStr for UpdateStrategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "confirm" | "confirm_then_patch" => Ok(Self::ConfirmThenPatch),
            "optimistic" | "patch_then_confirm" => Ok(Self::PatchThenConfirm),
            other => Err(anyhow!("unknown update strategy: {}", other)),
        }
    }
}

/// How cached views catch up with a confirmed delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteStrategy {
    /// Remove the tweet from every affected cached view.
    #[default]
    Evict,
    /// Drop every cached view so the next load starts from scratch.
    Reload,
}

impl FromStr for DeleteStrategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "evict" => Ok(Self::Evict),
            "reload" => Ok(Self::Reload),
            other => Err(anyhow!("unknown delete strategy: {}", other)),
        }
    }
}
