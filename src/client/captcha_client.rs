use std::time::Duration;

use reqwest::Client;

use serde::Deserialize;

use secrecy::Secret;

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("Missing CAPTCHA response")]
    Missing,
    #[error("CAPTCHA verification failed: {}", .0.join(", "))]
    Rejected(Vec<String>),
    #[error("CAPTCHA verification unavailable")]
    Unavailable(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// reCAPTCHA-style `siteverify` client. A disabled client accepts everything.
#[derive(Debug)]
pub struct CaptchaClient {
    client: Client,
    enabled: bool,
    site_key: String,
    secret_key: Secret<String>,
    verify_url: Url,
}

impl CaptchaClient {
    pub fn new(
        enabled: bool,
        site_key: String,
        secret_key: Secret<String>,
        verify_url: Url,
        api_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        Ok(Self {
            client,
            enabled,
            site_key,
            secret_key,
            verify_url,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Public key handed to the submission form
    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    #[tracing::instrument(name = "Verify CAPTCHA response", skip(self, response))]
    pub async fn verify(&self, response: Option<&str>) -> Result<(), CaptchaError> {
        use secrecy::ExposeSecret;

        if !self.enabled {
            return Ok(());
        }

        let response = response
            .map(str::trim)
            .filter(|response| !response.is_empty())
            .ok_or(CaptchaError::Missing)?;

        let verdict: VerifyResponse = self
            .client
            .post(self.verify_url.clone())
            .form(&[
                ("secret", self.secret_key.expose_secret().as_str()),
                ("response", response),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if verdict.success {
            Ok(())
        } else {
            Err(CaptchaError::Rejected(verdict.error_codes))
        }
    }
}
