use thiserror::Error;

/// Failures surfaced to the caller of a feed action. None of them is fatal;
/// the caller decides whether to show anything.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("viewer is not signed in")]
    Unauthenticated,

    #[error("only the author can delete this tweet")]
    NotAuthor,

    #[error("mutation rejected: {0}")]
    Gateway(#[source] anyhow::Error),

    #[error("failed to fetch feed: {0}")]
    Fetch(#[source] anyhow::Error),
}
