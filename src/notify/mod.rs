// src/notify/mod.rs
//! Digest delivery: plain-text rendering + the mailer seam.

pub mod email;

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::post::DigestPost;
pub use email::EmailSender;

/// Delivery channel for digests. Implemented over SMTP in production and by
/// recording fakes in tests.
#[async_trait::async_trait]
pub trait DigestMailer: Send + Sync {
    async fn send_digest(&self, recipient: &str, posts: &[DigestPost], preview: bool)
        -> Result<()>;
    async fn send_test(&self, recipient: &str) -> Result<()>;
}

/// Used when no SMTP relay is configured: every send fails, so nothing is
/// marked as sent.
pub struct DisabledMailer;

#[async_trait::async_trait]
impl DigestMailer for DisabledMailer {
    async fn send_digest(&self, _recipient: &str, _posts: &[DigestPost], _preview: bool)
        -> Result<()> {
        bail!("email delivery is not configured (set SMTP_HOST)")
    }

    async fn send_test(&self, _recipient: &str) -> Result<()> {
        bail!("email delivery is not configured (set SMTP_HOST)")
    }
}

pub fn digest_subject(date: NaiveDate, preview: bool) -> String {
    let subject = format!("Your Reddit Digest - {}", date.format("%B %d, %Y"));
    if preview {
        format!("[PREVIEW] {subject}")
    } else {
        subject
    }
}

pub const TEST_SUBJECT: &str = "Reddit Summarizer - Test Email";

pub fn test_body() -> String {
    "Test Email\n\n\
     If you're reading this, your Reddit Summarizer email configuration is working correctly!\n\
     You're all set to receive your daily digests.\n"
        .to_string()
}

pub fn render_digest_text(posts: &[DigestPost], preview: bool, date: NaiveDate) -> String {
    let mut out = String::new();
    if preview {
        out.push_str("*** PREVIEW MODE ***\n");
        out.push_str("This is a preview. Posts will not be marked as sent.\n\n");
    }
    out.push_str("Your Reddit Digest\n");
    out.push_str(&format!("{}\n", date.format("%A, %B %d, %Y")));
    out.push_str(&"=".repeat(40));
    out.push_str("\n\n");

    for (i, p) in posts.iter().enumerate() {
        out.push_str(&format!(
            "{}. [r/{}] {} upvotes · {} comments\n",
            i + 1,
            p.subreddit,
            p.score,
            p.num_comments
        ));
        out.push_str(&format!("   {}\n", p.title));
        out.push_str(&format!("   {}\n\n", p.url));
        out.push_str(&format!("   {}\n\n", p.summary));
    }

    out.push_str(&"-".repeat(40));
    out.push_str("\nYou're receiving this digest because you configured Reddit Summarizer.\n");
    out.push_str("Manage your preferences in the dashboard.\n");
    out
}
