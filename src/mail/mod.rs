mod smtp;
pub mod templates;

use async_trait::async_trait;

pub use smtp::SmtpMailer;

/// A rendered HTML message addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

#[cfg(test)]
pub use fake::RecordingMailer;

#[cfg(test)]
mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{Mailer, OutgoingMail};

    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
            self.sent
                .lock()
                .map_err(|_| anyhow::anyhow!("mailer poisoned"))?
                .push(mail);
            Ok(())
        }
    }
}
