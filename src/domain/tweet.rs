use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Signed so a transient client-side underflow stays representable.
    pub like_count: i64,
    pub liked_by_me: bool,
    pub assessment: bool,
    #[serde(rename = "user")]
    pub author: Author,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl Tweet {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author.id == user_id
    }
}
