//! Forum digest service — binary entrypoint.
//! Boots the Axum HTTP server, the daily digest job and the metrics exporter.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forum_digest::api::{self, AppState};
use forum_digest::config::Settings;
use forum_digest::digest::DigestService;
use forum_digest::fetch::{reddit::RedditSource, PostSource};
use forum_digest::metrics::Metrics;
use forum_digest::notify::{DigestMailer, DisabledMailer, EmailSender};
use forum_digest::scheduler::{scheduled_time, spawn_daily_digest};
use forum_digest::store::DigestStore;
use forum_digest::summarize::{ai_adapter::default_cache_dir, build_client, PostSummarizer};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DIGEST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DIGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("forum_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_dev_tracing();

    let settings = Settings::load()?;

    let store = Arc::new(
        DigestStore::open(&settings.database_path, settings.default_preferences())
            .context("opening digest store")?,
    );
    let seeded = store
        .seed_groups(&settings.groups, chrono::Utc::now())
        .context("seeding subreddits")?;
    if seeded > 0 {
        tracing::info!(seeded, "seeded subreddits from config");
    }

    let source: Arc<dyn PostSource> = Arc::new(RedditSource::http()?);
    let ai = build_client(&settings.ai, default_cache_dir());
    let summarizer = PostSummarizer::new(ai, source.clone());
    tracing::info!(provider = summarizer.provider_name(), "summaries enabled");

    let mailer: Arc<dyn DigestMailer> = match &settings.smtp {
        Some(cfg) => Arc::new(EmailSender::from_config(cfg)?),
        None => {
            tracing::warn!("SMTP_HOST not set; digests cannot be emailed");
            Arc::new(DisabledMailer)
        }
    };

    let service = Arc::new(DigestService::new(
        store,
        source,
        summarizer,
        mailer,
        settings.fetch_limit,
    ));

    let metrics = Metrics::init(settings.posts_per_digest)?;
    // stored preference wins over the config default once the store exists
    let digest_at = scheduled_time(service.store())?;
    spawn_daily_digest(service.clone(), digest_at);

    let router = api::router(AppState::new(service)).merge(metrics.router());
    Ok(router.into())
}
