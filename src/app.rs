use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::client::{CaptchaClient, EmailSender};
use crate::controller;
use crate::crypto::SigningKey;
use crate::pdf::{PdfMerger, PdfRenderer};
use crate::pipeline::SubmissionPipeline;
use crate::repo::Store;
use crate::settings::{AdminSettings, AuthSettings, PdfSettings};

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Collaborators and settings shared by every request
pub struct Services {
    pub store: Arc<dyn Store>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub merger: Arc<dyn PdfMerger>,
    pub email_sender: Arc<dyn EmailSender>,
    pub captcha: CaptchaClient,
    pub signing_key: SigningKey,
    pub auth: AuthSettings,
    pub admin: AdminSettings,
    pub pdf: PdfSettings,
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, services: Services) -> anyhow::Result<Server> {
    let pipeline = SubmissionPipeline::new(
        Arc::clone(&services.store),
        services.renderer,
        services.email_sender,
        services.pdf.default_filename.clone(),
    );

    // Wrap application data
    let store: web::Data<dyn Store> = web::Data::from(services.store);
    let merger: web::Data<dyn PdfMerger> = web::Data::from(services.merger);
    let pipeline = web::Data::new(pipeline);
    let captcha = web::Data::new(services.captcha);
    let signing_key = web::Data::new(services.signing_key);
    let auth = web::Data::new(services.auth);
    let admin = web::Data::new(services.admin);
    let pdf = web::Data::new(services.pdf);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(merger.clone())
            .app_data(pipeline.clone())
            .app_data(captcha.clone())
            .app_data(signing_key.clone())
            .app_data(auth.clone())
            .app_data(admin.clone())
            .app_data(pdf.clone())
            .service(health_check)
            .service(controller::api_scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
