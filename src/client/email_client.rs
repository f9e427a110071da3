use std::time::Duration;

use anyhow::Context;

use async_trait::async_trait;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::client::EmailSender;
use crate::domain::EmailAddress;

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Postmark-style REST email client
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        let api_send_email_url = api_base_url.join("email")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    #[tracing::instrument(
        name = "Send an email via API",
        skip(self, email),
        fields(recipient = %email.recipient, attachments = email.attachments.len())
    )]
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        use secrecy::ExposeSecret;

        let body = email.as_request(&self.sender);

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Failed to reach the email API")?
            .error_for_status()
            .context("Email API rejected the message")?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Email {
    pub recipient: EmailAddress,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn pdf(name: &str, content: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content_type: "application/pdf".into(),
            content,
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.content.len())
            .finish()
    }
}

impl Email {
    fn as_request<'e>(&'e self, sender: &'e EmailAddress) -> SendEmailRequest<'e> {
        SendEmailRequest {
            to: self.recipient.as_ref(),
            from: sender.as_ref(),
            subject: &self.subject,
            html_body: &self.html_body,
            text_body: &self.text_body,
            attachments: self
                .attachments
                .iter()
                .map(|attachment| AttachmentRequest {
                    name: &attachment.name,
                    content: STANDARD.encode(&attachment.content),
                    content_type: &attachment.content_type,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentRequest<'a> {
    name: &'a str,
    content: String,
    content_type: &'a str,
}
