// src/fetch/mod.rs
pub mod reddit;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::post::CandidatePost;
use crate::store::{DigestStore, SourceGroup};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_candidates_total",
            "Posts kept after threshold and sent-state filtering."
        );
        describe_counter!(
            "digest_filtered_total",
            "Posts dropped by group thresholds or because they were already sent."
        );
        describe_counter!(
            "digest_fetch_errors_total",
            "Group fetch/parse errors."
        );
        describe_histogram!("digest_parse_ms", "Listing parse time in milliseconds.");
    });
}

/// Where candidate posts and their comments come from.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Hot posts of one group, best-effort `limit`.
    async fn hot_posts(&self, group: &str, limit: usize) -> Result<Vec<CandidatePost>>;
    /// Top-level comment bodies of a post, in listing order.
    async fn top_comments(&self, post_id: &str, limit: usize) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}

/// Decode HTML entities and collapse whitespace. Punctuation is left alone
/// (title quality looks at `!` and `?`).
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if the post clears the group's thresholds.
pub fn passes_thresholds(post: &CandidatePost, group: &SourceGroup) -> bool {
    post.score >= group.min_upvotes && post.num_comments >= group.min_comments
}

/// Fetch candidates from every enabled group: threshold filter, then drop
/// posts already marked sent. A failing group is logged and contributes nothing.
pub async fn fetch_candidates(
    source: &dyn PostSource,
    store: &DigestStore,
    limit: usize,
) -> Vec<CandidatePost> {
    ensure_metrics_described();

    let mut out = Vec::new();
    for group in store.enabled_groups() {
        let posts = match source.hot_posts(&group.name, limit).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    target: "fetch",
                    error = ?e,
                    group = %group.name,
                    provider = source.name(),
                    "group fetch failed"
                );
                counter!("digest_fetch_errors_total").increment(1);
                continue;
            }
        };

        let total = posts.len();
        let kept: Vec<CandidatePost> = posts
            .into_iter()
            .filter(|p| passes_thresholds(p, &group) && !store.is_sent(&p.id))
            .collect();

        counter!("digest_candidates_total").increment(kept.len() as u64);
        counter!("digest_filtered_total").increment((total - kept.len()) as u64);
        tracing::debug!(
            target: "fetch",
            group = %group.name,
            fetched = total,
            kept = kept.len(),
            "group fetched"
        );
        out.extend(kept);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_decodes_entities_and_keeps_punctuation() {
        assert_eq!(
            clean_text("  Rust &amp; Go:\n  which one?? "),
            "Rust & Go: which one??"
        );
        assert_eq!(clean_text("&lt;3 &quot;quoted&quot;"), "<3 \"quoted\"");
    }
}
