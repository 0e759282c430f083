//! Print today's digest to stdout without mailing or marking anything sent.
//!
//! Uses the same settings as the service (`.env`, `config/digest.toml`).

use std::sync::Arc;

use anyhow::Result;

use forum_digest::config::Settings;
use forum_digest::digest::DigestService;
use forum_digest::fetch::{reddit::RedditSource, PostSource};
use forum_digest::notify::{render_digest_text, DisabledMailer};
use forum_digest::store::DigestStore;
use forum_digest::summarize::{ai_adapter::default_cache_dir, build_client, PostSummarizer};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::load()?;
    let store = Arc::new(DigestStore::open(
        &settings.database_path,
        settings.default_preferences(),
    )?);
    store.seed_groups(&settings.groups, chrono::Utc::now())?;

    let source: Arc<dyn PostSource> = Arc::new(RedditSource::http()?);
    let ai = build_client(&settings.ai, default_cache_dir());
    let service = DigestService::new(
        store,
        source.clone(),
        PostSummarizer::new(ai, source),
        Arc::new(DisabledMailer),
        settings.fetch_limit,
    );

    let posts = service.preview().await?;
    if posts.is_empty() {
        println!("no posts found");
        return Ok(());
    }
    print!(
        "{}",
        render_digest_text(&posts, true, chrono::Utc::now().date_naive())
    );
    Ok(())
}
