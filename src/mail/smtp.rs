use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use super::{Mailer, OutgoingMail};
use crate::config::SmtpConfig;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds an implicit-TLS relay (SMTPS) for the configured host.
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = format!("\"{}\" <{}>", cfg.from_name, cfg.username)
            .parse()
            .context("parse sender mailbox")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("build smtp relay")?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();

        debug!(host = %cfg.host, port = cfg.port, "smtp transport ready");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to: Mailbox = mail.to.parse().context("parse recipient mailbox")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .context("build email")?;

        self.transport.send(message).await.context("smtp send")?;
        info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(())
    }
}
