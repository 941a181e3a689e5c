use anyhow::anyhow;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tweetline::config::AppConfig;
use tweetline::domain::feed::FeedKey;
use tweetline::domain::session::{Session, Viewer};
use tweetline::infra::db::Db;
use tweetline::infra::store::PgTweetStore;
use tweetline::FeedClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    db.ping().await?;

    let session = match &config.viewer_id {
        Some(id) => Session::authenticated(Viewer {
            id: id.clone(),
            name: None,
        }),
        None => Session::anonymous(),
    };

    let key = match config.app_mode.as_str() {
        "feed" => FeedKey::All,
        "following" => FeedKey::Following,
        "profile" => {
            let user_id = config
                .profile_user_id
                .clone()
                .or_else(|| config.viewer_id.clone())
                .ok_or_else(|| anyhow!("profile mode needs PROFILE_USER_ID or VIEWER_ID"))?;
            FeedKey::profile(user_id)
        }
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    };

    let store = Arc::new(PgTweetStore::new(db, config.viewer_id.clone()));
    let client = FeedClient::new(store, session, &config.feed)?;

    client.feeds.load(&key).await?;
    let list = client.list(&key).await;
    tracing::info!(feed = %key, tweets = list.cards().len(), "loaded feed");
    println!("{}", serde_json::to_string_pretty(&list)?);

    Ok(())
}
