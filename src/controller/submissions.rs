use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use serde::Serialize;

use crate::client::CaptchaClient;
use crate::domain::{NewTicketResponse, SubmissionPayload};
use crate::error::{RestError, RestResult};
use crate::pipeline::SubmissionPipeline;
use crate::repo::Store;

#[derive(Debug, Serialize)]
struct SiteKeyBody<'a> {
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct SubmittedBody {
    id: i64,
    #[serde(rename = "email-sent")]
    email_sent: bool,
}

/// CAPTCHA site key for the submission form
#[tracing::instrument(name = "Get submission form key", skip(captcha))]
#[get("")]
async fn site_key(captcha: web::Data<CaptchaClient>) -> impl Responder {
    HttpResponse::Ok().json(SiteKeyBody {
        key: captcha.site_key(),
    })
}

#[tracing::instrument(name = "Submit a ticket response", skip_all)]
#[post("")]
async fn submit(
    body: web::Json<SubmissionPayload>,
    captcha: web::Data<CaptchaClient>,
    store: web::Data<dyn Store>,
    pipeline: web::Data<SubmissionPipeline>,
) -> RestResult<impl Responder> {
    let payload = body.into_inner();

    captcha
        .verify(payload.captcha_response.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(error.cause_chain = ?e, "CAPTCHA check failed");
            RestError::Forbidden(e.to_string())
        })?;

    let new_ticket = NewTicketResponse::try_from(&payload).map_err(RestError::ValidationError)?;

    if store
        .fetch_location(new_ticket.hearing_location_id)
        .await?
        .is_none()
    {
        return Err(RestError::ValidationError(format!(
            "Unknown hearing location {}",
            new_ticket.hearing_location_id
        )));
    }

    let submission = pipeline.submit(&new_ticket, &payload).await?;

    Ok(HttpResponse::Ok().json(SubmittedBody {
        id: submission.ticket.id,
        email_sent: submission.outcome.email_sent(),
    }))
}

/// Citizen-facing submission endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/submit-form").service(site_key).service(submit)
}
