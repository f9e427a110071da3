use async_trait::async_trait;

mod captcha_client;
mod email_client;

pub use captcha_client::{CaptchaClient, CaptchaError};
pub use email_client::{Attachment, Email, EmailClient};

/// Outbound email transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}
