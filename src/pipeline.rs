use std::sync::Arc;

use anyhow::Context;

use chrono::Utc;

use crate::client::{Attachment, Email, EmailSender};
use crate::domain::{EmailAddress, NewTicketResponse, SubmissionPayload};
use crate::pdf::{PdfRenderer, TicketDocument};
use crate::repo::{Store, StoreResult, TicketResponse};
use crate::telemetry::spawn_blocking_with_tracing;

/// How far a stored submission got through PDF preparation and delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// PDF prepared and emailed to the disputant
    Emailed,
    /// PDF prepared, email failed
    PdfOnly,
    /// PDF preparation failed, only the record was kept
    RecordOnly,
}

impl SubmissionOutcome {
    pub fn email_sent(&self) -> bool {
        matches!(self, Self::Emailed)
    }
}

/// A stored submission and how far it got
#[derive(Debug, Clone)]
pub struct Submission {
    pub ticket: TicketResponse,
    pub outcome: SubmissionOutcome,
}

/// Persist a submission, prepare its PDF and email it.
///
/// The caller owns CAPTCHA checks and validation. Once the record is stored,
/// nothing downstream can fail the submission: PDF and email failures are
/// logged and reported through [`SubmissionOutcome`].
pub struct SubmissionPipeline {
    store: Arc<dyn Store>,
    renderer: Arc<dyn PdfRenderer>,
    email_sender: Arc<dyn EmailSender>,
    pdf_filename: String,
}

impl SubmissionPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        renderer: Arc<dyn PdfRenderer>,
        email_sender: Arc<dyn EmailSender>,
        pdf_filename: String,
    ) -> Self {
        Self {
            store,
            renderer,
            email_sender,
            pdf_filename,
        }
    }

    #[tracing::instrument(
        name = "Process ticket submission",
        skip_all,
        fields(ticket_number = %new_ticket.ticket_number, ticket_id = tracing::field::Empty)
    )]
    pub async fn submit(
        &self,
        new_ticket: &NewTicketResponse,
        payload: &SubmissionPayload,
    ) -> StoreResult<Submission> {
        let mut ticket = self.store.insert_ticket(new_ticket).await?;
        tracing::Span::current().record("ticket_id", ticket.id);

        let outcome = match self.prepare_pdf(&mut ticket, payload).await {
            Ok(pdf) => match self.send_pdf(&new_ticket.email, pdf).await {
                Ok(()) => {
                    ticket.emailed_date = Some(Utc::now());
                    SubmissionOutcome::Emailed
                }
                Err(e) => {
                    tracing::error!(error.cause_chain = ?e, "Failed to email ticket PDF");
                    SubmissionOutcome::PdfOnly
                }
            },
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to prepare ticket PDF");
                SubmissionOutcome::RecordOnly
            }
        };

        // The base record already exists, so a failed final save is not the caller's problem
        if let Err(e) = self.store.update_ticket(&ticket).await {
            tracing::error!(error.cause_chain = ?e, "Failed to save ticket after PDF preparation");
        }

        Ok(Submission { ticket, outcome })
    }

    /// Render, store and link the PDF, returning its bytes
    async fn prepare_pdf(
        &self,
        ticket: &mut TicketResponse,
        payload: &SubmissionPayload,
    ) -> anyhow::Result<Vec<u8>> {
        let location = self
            .store
            .fetch_location(ticket.hearing_location_id)
            .await?
            .map(|location| location.name)
            .unwrap_or_default();
        let document = TicketDocument::new(ticket, &location, &payload.answers);

        let renderer = Arc::clone(&self.renderer);
        let pdf = spawn_blocking_with_tracing(move || renderer.render(&document))
            .await
            .context("Failed to spawn blocking task")??;

        let pdf_id = self.store.insert_pdf(&pdf).await?;
        ticket.prepared_pdf_id = Some(pdf_id);
        ticket.printed_date = Some(Utc::now());

        Ok(pdf)
    }

    async fn send_pdf(&self, recipient: &EmailAddress, pdf: Vec<u8>) -> anyhow::Result<()> {
        let email = Email {
            recipient: recipient.clone(),
            subject: "Your traffic ticket dispute".into(),
            html_body: "<p>Thank you for submitting your traffic ticket dispute. \
                A copy of your response is attached.</p>"
                .into(),
            text_body: "Thank you for submitting your traffic ticket dispute. \
                A copy of your response is attached."
                .into(),
            attachments: vec![Attachment::pdf(&self.pdf_filename, pdf)],
        };

        self.email_sender.send(&email).await
    }
}
