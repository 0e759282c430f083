// src/digest.rs
//! One digest run: fetch → rank → diversify → summarize → mail.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::fetch::{fetch_candidates, PostSource};
use crate::notify::DigestMailer;
use crate::post::{DigestPost, RankedPost};
use crate::ranking::{rank, select_diverse};
use crate::store::{DigestStore, DEFAULT_CACHE_RETENTION_DAYS};
use crate::summarize::PostSummarizer;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest runs by mode.");
        describe_counter!("digest_emails_sent_total", "Digest emails handed to SMTP.");
        describe_histogram!("digest_rank_ms", "Rank + select time in milliseconds.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMode {
    Scheduled,
    Preview,
}

impl DigestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestMode::Scheduled => "scheduled",
            DigestMode::Preview => "preview",
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, DigestMode::Preview)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DigestOutcome {
    NoPosts,
    Sent { recipient: String, post_count: usize },
}

pub struct DigestService {
    store: Arc<DigestStore>,
    source: Arc<dyn PostSource>,
    summarizer: PostSummarizer,
    mailer: Arc<dyn DigestMailer>,
    fetch_limit: usize,
}

impl DigestService {
    pub fn new(
        store: Arc<DigestStore>,
        source: Arc<dyn PostSource>,
        summarizer: PostSummarizer,
        mailer: Arc<dyn DigestMailer>,
        fetch_limit: usize,
    ) -> Self {
        Self {
            store,
            source,
            summarizer,
            mailer,
            fetch_limit,
        }
    }

    pub fn store(&self) -> &Arc<DigestStore> {
        &self.store
    }

    pub async fn top_posts(&self, count: usize) -> Result<Vec<RankedPost>> {
        self.top_posts_at(count, Utc::now()).await
    }

    /// Selected posts are written to the cache (unsent) so a later
    /// scheduled run can mark them.
    pub async fn top_posts_at(&self, count: usize, now: DateTime<Utc>) -> Result<Vec<RankedPost>> {
        ensure_metrics_described();

        let candidates = fetch_candidates(self.source.as_ref(), &self.store, self.fetch_limit).await;
        if candidates.is_empty() {
            tracing::info!(target: "digest", "no candidate posts");
            return Ok(Vec::new());
        }

        let t0 = Instant::now();
        let ranked = rank(&candidates, now.timestamp());
        let selected = select_diverse(ranked, count);
        histogram!("digest_rank_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let to_cache = selected.clone();
        self.store
            .blocking(move |s| s.cache_posts(&to_cache, now))
            .await
            .context("caching selected posts")?;

        tracing::info!(
            target: "digest",
            candidates = candidates.len(),
            count = selected.len(),
            "posts selected"
        );
        Ok(selected)
    }

    fn posts_per_digest(&self) -> usize {
        self.store.preferences().posts_per_digest as usize
    }

    /// Summarized top posts; nothing is mailed or marked sent.
    pub async fn preview(&self) -> Result<Vec<DigestPost>> {
        let selected = self.top_posts(self.posts_per_digest()).await?;
        Ok(self.summarizer.summarize_posts(&selected).await)
    }

    pub async fn send(&self, mode: DigestMode) -> Result<DigestOutcome> {
        ensure_metrics_described();
        counter!("digest_runs_total", "mode" => mode.as_str()).increment(1);

        let recipient = self.recipient()?;
        let now = Utc::now();
        let selected = self.top_posts_at(self.posts_per_digest(), now).await?;
        if selected.is_empty() {
            return Ok(DigestOutcome::NoPosts);
        }

        let posts = self.summarizer.summarize_posts(&selected).await;
        self.mailer
            .send_digest(&recipient, &posts, mode.is_preview())
            .await
            .with_context(|| format!("sending {} digest to {recipient}", mode.as_str()))?;
        counter!("digest_emails_sent_total", "mode" => mode.as_str()).increment(1);

        if !mode.is_preview() {
            let ids: Vec<String> = posts.iter().map(|p| p.post_id.clone()).collect();
            self.store
                .blocking(move |s| s.mark_sent(&ids, now))
                .await
                .context("marking posts as sent")?;
            let removed = self
                .store
                .blocking(move |s| s.cleanup_older_than(DEFAULT_CACHE_RETENTION_DAYS, now))
                .await
                .context("cleaning post cache")?;
            tracing::debug!(target: "digest", removed, "post cache cleaned");
        }

        tracing::info!(
            target: "digest",
            mode = mode.as_str(),
            %recipient,
            count = posts.len(),
            "digest sent"
        );
        Ok(DigestOutcome::Sent {
            recipient,
            post_count: posts.len(),
        })
    }

    pub async fn send_test_email(&self) -> Result<String> {
        let recipient = self.recipient()?;
        self.mailer
            .send_test(&recipient)
            .await
            .with_context(|| format!("sending test email to {recipient}"))?;
        Ok(recipient)
    }

    fn recipient(&self) -> Result<String> {
        let email = self.store.preferences().email_address;
        if email.trim().is_empty() {
            bail!("no recipient email address configured");
        }
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_status_tag() {
        assert_eq!(
            serde_json::to_value(DigestOutcome::NoPosts).unwrap(),
            serde_json::json!({"status": "no_posts"})
        );
        let sent = DigestOutcome::Sent {
            recipient: "me@example.com".into(),
            post_count: 3,
        };
        assert_eq!(
            serde_json::to_value(sent).unwrap(),
            serde_json::json!({"status": "sent", "recipient": "me@example.com", "post_count": 3})
        );
    }

    #[test]
    fn mode_flags() {
        assert!(DigestMode::Preview.is_preview());
        assert!(!DigestMode::Scheduled.is_preview());
        assert_eq!(DigestMode::Scheduled.as_str(), "scheduled");
    }
}
