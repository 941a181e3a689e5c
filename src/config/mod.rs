use anyhow::{anyhow, Result};
use std::str::FromStr;
use time::UtcOffset;

use crate::domain::engagement::{AssessmentPolicy, DeleteStrategy, UpdateStrategy};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_DATE_FORMAT: &str = "[month padding:none]/[day padding:none]/[year repr:last_two]";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub app_mode: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub viewer_id: Option<String>,
    pub profile_user_id: Option<String>,
    pub feed: FeedSettings,
}

/// Client-side behaviour of the feed cache and its actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSettings {
    pub page_size: usize,
    pub update_strategy: UpdateStrategy,
    pub assessment_policy: AssessmentPolicy,
    pub delete_strategy: DeleteStrategy,
    pub date_format: String,
    pub display_offset: UtcOffset,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            update_strategy: UpdateStrategy::default(),
            assessment_policy: AssessmentPolicy::default(),
            delete_strategy: DeleteStrategy::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            display_offset: UtcOffset::UTC,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_mode: env_or("APP_MODE", "feed"),
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            viewer_id: std::env::var("VIEWER_ID").ok(),
            profile_user_id: std::env::var("PROFILE_USER_ID").ok(),
            feed: FeedSettings::from_env()?,
        })
    }
}

impl FeedSettings {
    pub fn from_env() -> Result<Self> {
        let page_size: usize = env_or_parse("FEED_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())?;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(anyhow!(
                "invalid FEED_PAGE_SIZE: must be between 1 and {}",
                MAX_PAGE_SIZE
            ));
        }

        let offset_minutes: i32 = env_or_parse("DISPLAY_UTC_OFFSET_MINUTES", "0")?;
        let display_offset = display_offset(offset_minutes)?;

        let date_format = env_or("DATE_FORMAT", DEFAULT_DATE_FORMAT);
        time::format_description::parse_owned::<1>(&date_format)
            .map_err(|err| anyhow!("invalid DATE_FORMAT: {}", err))?;

        Ok(Self {
            page_size,
            update_strategy: env_or_parse("UPDATE_STRATEGY", "confirm")?,
            assessment_policy: env_or_parse("ASSESSMENT_POLICY", "independent")?,
            delete_strategy: env_or_parse("DELETE_STRATEGY", "evict")?,
            date_format,
            display_offset,
        })
    }
}

/// Converts a whole-minute offset from UTC, rejecting anything outside the
/// range `UtcOffset` can hold.
pub fn display_offset(minutes: i32) -> Result<UtcOffset> {
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| anyhow!("invalid DISPLAY_UTC_OFFSET_MINUTES: {} is out of range", minutes))?;
    UtcOffset::from_whole_seconds(seconds)
        .map_err(|err| anyhow!("invalid DISPLAY_UTC_OFFSET_MINUTES: {}", err))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
