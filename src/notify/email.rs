use anyhow::{Context, Result};
use chrono::Utc;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{digest_subject, render_digest_text, test_body, DigestMailer, TEST_SUBJECT};
use crate::config::SmtpConfig;
use crate::post::DigestPost;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .with_context(|| format!("invalid SMTP host {:?}", cfg.host))?;
        if !cfg.user.is_empty() {
            builder = builder.credentials(Credentials::new(cfg.user.clone(), cfg.pass.clone()));
        }
        let from = cfg
            .from
            .parse()
            .with_context(|| format!("invalid sender address {:?}", cfg.from))?;
        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    async fn send_plain(&self, recipient: &str, subject: String, body: String) -> Result<()> {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("invalid recipient address {recipient:?}"))?;
        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DigestMailer for EmailSender {
    async fn send_digest(&self, recipient: &str, posts: &[DigestPost], preview: bool)
        -> Result<()> {
        let today = Utc::now().date_naive();
        let subject = digest_subject(today, preview);
        let body = render_digest_text(posts, preview, today);
        self.send_plain(recipient, subject, body).await?;
        tracing::info!(target: "digest", %recipient, posts = posts.len(), preview, "digest email sent");
        Ok(())
    }

    async fn send_test(&self, recipient: &str) -> Result<()> {
        self.send_plain(recipient, TEST_SUBJECT.to_string(), test_body())
            .await
    }
}
