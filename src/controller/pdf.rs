use actix_web::dev::HttpServiceFactory;
use actix_web::http::header::{ContentDisposition, ContentType, DispositionParam, DispositionType};
use actix_web::{get, post, web, HttpResponse, Responder};

use anyhow::Context;

use chrono::Utc;

use serde::Deserialize;

use crate::auth::RequestContext;
use crate::error::{RestError, RestResult};
use crate::pdf::PdfMerger;
use crate::repo::Store;
use crate::settings::{AdminSettings, PdfSettings, PrintMarker};
use crate::telemetry::spawn_blocking_with_tracing;

/// `{"id": [..]}` body shared by merge and print-marking
#[derive(Debug, Deserialize)]
pub struct PdfIds {
    id: Vec<i64>,
}

/// View one prepared PDF inline
#[tracing::instrument(name = "Fetch prepared PDF", skip(store, settings))]
#[get("/{id}")]
async fn fetch(
    path: web::Path<(String,)>,
    store: web::Data<dyn Store>,
    settings: web::Data<PdfSettings>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let id: i64 = id
        .parse()
        .map_err(|_| RestError::ParseError(format!("Invalid PDF id: {}", id)))?;

    let pdf = store
        .fetch_pdf(id)
        .await?
        .ok_or_else(|| RestError::NotFound(format!("PDF {}", id)))?;
    let ticket = store
        .fetch_ticket_by_pdf(id)
        .await?
        .ok_or_else(|| RestError::NotFound(format!("Ticket response for PDF {}", id)))?;

    let filename = ticket
        .pdf_filename
        .unwrap_or_else(|| settings.default_filename.clone());

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(pdf.data))
}

/// Merge PDFs for printing, pages in the requested order
#[tracing::instrument(name = "Merge prepared PDFs", skip(store, merger))]
#[post("")]
async fn merge(
    body: web::Json<PdfIds>,
    store: web::Data<dyn Store>,
    merger: web::Data<dyn PdfMerger>,
) -> RestResult<impl Responder> {
    if body.id.is_empty() {
        return Err(RestError::ParseError("No PDF ids given".into()));
    }

    let pdfs: Vec<Vec<u8>> = store
        .fetch_pdfs(&body.id)
        .await?
        .into_iter()
        .map(|pdf| pdf.data)
        .collect();
    if pdfs.is_empty() {
        return Err(RestError::NotFound("None of the requested PDFs exist".into()));
    }

    let merger = merger.into_inner();
    let merged = spawn_blocking_with_tracing(move || merger.merge(&pdfs))
        .await
        .context("Failed to spawn blocking task")??;

    Ok(HttpResponse::Ok()
        .insert_header(ContentType::octet_stream())
        .body(merged))
}

/// Move submissions whose PDF is in the list to the archive bucket
#[tracing::instrument(name = "Mark ticket responses printed", skip(ctx, store, admin))]
#[post("")]
async fn mark_printed(
    ctx: RequestContext,
    body: web::Json<PdfIds>,
    store: web::Data<dyn Store>,
    admin: web::Data<AdminSettings>,
) -> RestResult<impl Responder> {
    let printed_by = match admin.print_marker {
        PrintMarker::Placeholder => admin.placeholder_user_id,
        PrintMarker::ActingUser => ctx.require_user()?.id,
    };

    let marked = store
        .mark_printed(&body.id, printed_by, Utc::now())
        .await?;
    tracing::info!(marked, printed_by, "Marked ticket responses printed");

    let mut res = HttpResponse::Ok();
    ctx.update_cookie(&mut res);

    Ok(res.json("success"))
}

/// PDF viewing and bulk printing endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/pdf").service(fetch).service(merge)
}

/// Print-marking endpoint
pub fn printed_scope() -> impl HttpServiceFactory {
    web::scope("/printed").service(mark_printed)
}
