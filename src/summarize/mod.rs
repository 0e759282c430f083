// src/summarize/mod.rs
//! Post summaries: gather title, body excerpt and top comments, ask the AI
//! client for 2-3 sentences, fall back to a fixed line on failure.

pub mod ai_adapter;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::fetch::PostSource;
use crate::post::{DigestPost, RankedPost};
pub use ai_adapter::{build_client, AiClient, DynAiClient};

pub const BODY_EXCERPT_CHARS: usize = 1000;
pub const COMMENT_EXCERPT_CHARS: usize = 300;
pub const MAX_COMMENTS: usize = 5;
pub const MAX_SUMMARY_CHARS: usize = 600;

fn describe_metrics() {
    describe_counter!(
        "digest_summary_failures_total",
        "Posts that fell back to the fixed summary line."
    );
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

pub struct PostSummarizer {
    ai: DynAiClient,
    source: Arc<dyn PostSource>,
}

impl PostSummarizer {
    pub fn new(ai: DynAiClient, source: Arc<dyn PostSource>) -> Self {
        Self { ai, source }
    }

    pub fn provider_name(&self) -> &'static str {
        self.ai.provider_name()
    }

    /// Title, body excerpt (self posts only) and numbered top comments.
    /// If comments can't be fetched the content degrades to title + URL.
    pub async fn post_content(&self, post: &RankedPost) -> String {
        let p = &post.post;
        let comments = match self.source.top_comments(&p.id, MAX_COMMENTS).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = ?e, post_id = %p.id, "comments unavailable");
                return format!("Title: {}\n\nPost URL: {}", p.title, p.url);
            }
        };
        build_post_content(post, &comments)
    }

    pub async fn summarize_post(&self, post: &RankedPost) -> String {
        let content = self.post_content(post).await;
        let prompt = summary_prompt(&content);
        match self.ai.complete(&prompt).await {
            Some(text) => {
                let cleaned = sanitize_summary(&text);
                if cleaned.is_empty() {
                    fallback_summary(post)
                } else {
                    cleaned
                }
            }
            None => {
                counter!("digest_summary_failures_total").increment(1);
                tracing::warn!(
                    post_id = %post.post.id,
                    provider = self.ai.provider_name(),
                    "summary unavailable, using fallback"
                );
                fallback_summary(post)
            }
        }
    }

    /// Summaries in input order, one AI call per post.
    pub async fn summarize_posts(&self, posts: &[RankedPost]) -> Vec<DigestPost> {
        ensure_metrics_described();
        let mut out = Vec::with_capacity(posts.len());
        for p in posts {
            let summary = self.summarize_post(p).await;
            out.push(DigestPost::from_ranked(p, summary));
        }
        out
    }
}

pub fn build_post_content(post: &RankedPost, comments: &[String]) -> String {
    let p = &post.post;
    let mut content = format!("Title: {}\n\n", p.title);

    if p.is_self {
        if let Some(body) = p.selftext.as_deref().filter(|b| !b.trim().is_empty()) {
            content.push_str("Post Content:\n");
            content.push_str(&truncate_chars(body, BODY_EXCERPT_CHARS));
            content.push_str("\n\n");
        }
    }

    if !comments.is_empty() {
        content.push_str("Top Comments:\n");
        for (i, c) in comments.iter().take(MAX_COMMENTS).enumerate() {
            content.push_str(&format!(
                "{}. {}\n\n",
                i + 1,
                truncate_chars(c, COMMENT_EXCERPT_CHARS)
            ));
        }
    }
    content
}

pub fn summary_prompt(content: &str) -> String {
    format!(
        "Summarize this Reddit post and its discussion in 2-3 concise sentences.\n\
         Focus on the key points and main takeaways. Be informative and objective.\n\n\
         {content}\n\nSummary:"
    )
}

pub fn fallback_summary(post: &RankedPost) -> String {
    format!("Unable to generate summary. {}", post.post.title)
}

/// Single line, collapsed whitespace, capped at [`MAX_SUMMARY_CHARS`].
pub fn sanitize_summary(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_SUMMARY_CHARS).trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
