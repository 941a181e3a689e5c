use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{AssessmentToggled, LikeToggled};
use crate::domain::feed::{FeedCursor, FeedKey, FeedPage};
use crate::domain::tweet::{Author, Tweet};
use crate::infra::db::Db;
use crate::infra::gateway::{FeedSource, MutationGateway};

const TWEET_COLUMNS: &str = "t.id, t.content, t.created_at, \
     u.id AS author_id, u.name AS author_name, u.image AS author_image, \
     (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count, \
     EXISTS (SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.user_id = $1) AS liked_by_me, \
     EXISTS (SELECT 1 FROM assessments a WHERE a.tweet_id = t.id AND a.user_id = $1) AS assessment";

/// Postgres-backed feed source and mutation gateway, acting as one viewer.
#[derive(Clone)]
pub struct PgTweetStore {
    db: Db,
    viewer_id: Option<String>,
}

impl PgTweetStore {
    pub fn new(db: Db, viewer_id: Option<String>) -> Self {
        Self { db, viewer_id }
    }

    pub fn for_viewer(&self, viewer_id: Option<String>) -> Self {
        Self {
            db: self.db.clone(),
            viewer_id,
        }
    }

    fn require_viewer(&self) -> Result<&str> {
        self.viewer_id
            .as_deref()
            .ok_or_else(|| anyhow!("viewer is not signed in"))
    }

    pub async fn upsert_user(&self, id: &str, name: Option<&str>, image: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, image) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image",
        )
        .bind(id)
        .bind(name)
        .bind(image)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn follow(&self, following_id: &str) -> Result<()> {
        let viewer_id = self.require_viewer()?;
        sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(viewer_id)
        .bind(following_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn create_tweet(&self, content: &str) -> Result<Tweet> {
        let viewer_id = self.require_viewer()?;
        let id = Uuid::new_v4().to_string();
        let sql = format!(
            "WITH inserted AS ( \
                INSERT INTO tweets (id, user_id, content) VALUES ($2, $3, $4) \
                RETURNING id, user_id, content, created_at \
             ) \
             SELECT {} FROM inserted t JOIN users u ON u.id = t.user_id",
            TWEET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(&id)
            .bind(viewer_id)
            .bind(content)
            .fetch_one(self.db.pool())
            .await?;

        // A new tweet has no likes or assessments yet.
        tweet_from_row(&row)
    }
}

#[async_trait]
impl FeedSource for PgTweetStore {
    async fn fetch_feed(
        &self,
        key: &FeedKey,
        cursor: Option<&FeedCursor>,
        limit: usize,
    ) -> Result<FeedPage> {
        let (filter, profile_id) = match key {
            FeedKey::All => ("TRUE", None),
            FeedKey::Following => {
                self.require_viewer()?;
                (
                    "t.user_id IN (SELECT following_id FROM follows WHERE follower_id = $1)",
                    None,
                )
            }
            FeedKey::Profile { user_id } => ("t.user_id = $2", Some(user_id.as_str())),
        };

        let sql = format!(
            "SELECT {} \
             FROM tweets t \
             JOIN users u ON u.id = t.user_id \
             WHERE {} \
               AND ($3::timestamptz IS NULL \
                    OR t.created_at < $3 \
                    OR (t.created_at = $3 AND t.id < $4)) \
             ORDER BY t.created_at DESC, t.id DESC \
             LIMIT $5",
            TWEET_COLUMNS, filter
        );

        let limit_plus = i64::try_from(limit).unwrap_or(i64::MAX).saturating_add(1);
        let rows = sqlx::query(&sql)
            .bind(self.viewer_id.as_deref())
            .bind(profile_id)
            .bind(cursor.map(|cursor| cursor.created_at))
            .bind(cursor.map(|cursor| cursor.id.as_str()))
            .bind(limit_plus)
            .fetch_all(self.db.pool())
            .await?;

        let mut tweets = Vec::with_capacity(rows.len());
        for row in &rows {
            tweets.push(tweet_from_row(row)?);
        }

        Ok(page_from(tweets, limit))
    }
}

#[async_trait]
impl MutationGateway for PgTweetStore {
    async fn toggle_like(&self, tweet_id: &str) -> Result<LikeToggled> {
        let viewer_id = self.require_viewer()?;
        let inserted = sqlx::query(
            "INSERT INTO likes (user_id, tweet_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(viewer_id)
        .bind(tweet_id)
        .execute(self.db.pool())
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(LikeToggled { added_like: true });
        }

        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND tweet_id = $2")
            .bind(viewer_id)
            .bind(tweet_id)
            .execute(self.db.pool())
            .await?;

        Ok(LikeToggled { added_like: false })
    }

    async fn toggle_assessment(&self, tweet_id: &str) -> Result<AssessmentToggled> {
        let viewer_id = self.require_viewer()?;
        let inserted = sqlx::query(
            "INSERT INTO assessments (user_id, tweet_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(viewer_id)
        .bind(tweet_id)
        .execute(self.db.pool())
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(AssessmentToggled {
                added_assessment: true,
            });
        }

        sqlx::query("DELETE FROM assessments WHERE user_id = $1 AND tweet_id = $2")
            .bind(viewer_id)
            .bind(tweet_id)
            .execute(self.db.pool())
            .await?;

        Ok(AssessmentToggled {
            added_assessment: false,
        })
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<()> {
        let viewer_id = self.require_viewer()?;
        let result = sqlx::query("DELETE FROM tweets WHERE id = $1 AND user_id = $2")
            .bind(tweet_id)
            .bind(viewer_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("tweet not found or not owned by viewer"));
        }
        Ok(())
    }
}

fn tweet_from_row(row: &PgRow) -> Result<Tweet> {
    let created_at: OffsetDateTime = row.try_get("created_at")?;
    Ok(Tweet {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        created_at,
        like_count: row.try_get("like_count")?,
        liked_by_me: row.try_get("liked_by_me")?,
        assessment: row.try_get("assessment")?,
        author: Author {
            id: row.try_get("author_id")?,
            name: row.try_get("author_name")?,
            image: row.try_get("author_image")?,
        },
    })
}

/// Trims a `limit + 1` fetch down to one page and derives its cursor.
pub(crate) fn page_from(mut tweets: Vec<Tweet>, limit: usize) -> FeedPage {
    let next_cursor = if tweets.len() > limit {
        tweets.truncate(limit);
        tweets.last().map(FeedCursor::after)
    } else {
        None
    };

    FeedPage {
        tweets: tweets.into_iter().map(std::sync::Arc::new).collect(),
        next_cursor,
    }
}
