use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::postgres::PgPoolOptions;

use ticket_response::app::{self, Services};
use ticket_response::client::{CaptchaClient, EmailClient};
use ticket_response::crypto::SigningKey;
use ticket_response::pdf::{LopdfMerger, TicketPdfRenderer};
use ticket_response::repo::PgStore;
use ticket_response::settings::Settings;
use ticket_response::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load()?;

    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy_with(settings.database.with_db());
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let email_client = EmailClient::new(
        settings.email.sender()?,
        settings.email.api_timeout(),
        settings.email.api_base_url()?,
        settings.email.api_auth_token(),
    )?;

    let captcha = CaptchaClient::new(
        settings.captcha.enabled(),
        settings.captcha.site_key().to_string(),
        settings.captcha.secret_key(),
        settings.captcha.verify_url()?,
        settings.captcha.api_timeout(),
    )?;
    if !captcha.enabled() {
        tracing::warn!("CAPTCHA verification is disabled");
    }

    let signing_key = SigningKey::new(settings.app.secret_key())?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let services = Services {
        store: Arc::new(PgStore::new(pool)),
        renderer: Arc::new(TicketPdfRenderer::new()),
        merger: Arc::new(LopdfMerger::new()),
        email_sender: Arc::new(email_client),
        captcha,
        signing_key,
        auth: settings.auth,
        admin: settings.admin,
        pdf: settings.pdf,
    };

    app::run(listener, services)?
        .await
        .context("Failed to run app")
}
