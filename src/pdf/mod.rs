use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use serde_json::Value;

mod merge;
mod render;

pub use merge::LopdfMerger;
pub use render::TicketPdfRenderer;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Nothing to merge")]
    NothingToMerge,
    #[error("PDF has no pages")]
    NoPages,
    #[error("Failed to read or write PDF: {0}")]
    Lopdf(#[from] lopdf::Error),
    #[error("Failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

pub type PdfResult<T> = Result<T, PdfError>;

/// Turns a submission into a printable PDF
pub trait PdfRenderer: Send + Sync {
    fn render(&self, document: &TicketDocument) -> PdfResult<Vec<u8>>;
}

/// Concatenates PDFs, pages in input order
pub trait PdfMerger: Send + Sync {
    fn merge(&self, pdfs: &[Vec<u8>]) -> PdfResult<Vec<u8>>;
}

/// Everything printed on a ticket response PDF
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDocument {
    pub ticket_number: String,
    pub disputant: String,
    pub email: String,
    pub ticket_date: NaiveDate,
    pub hearing_location: String,
    pub hearing_attendance: String,
    pub dispute_type: String,
    pub submitted: DateTime<Utc>,
    /// Remaining form answers as (label, value)
    pub answers: Vec<(String, String)>,
}

impl TicketDocument {
    pub fn new(
        ticket: &crate::repo::TicketResponse,
        hearing_location: &str,
        answers: &BTreeMap<String, Value>,
    ) -> Self {
        let disputant = [
            Some(ticket.first_name.as_str()),
            ticket.middle_name.as_deref(),
            Some(ticket.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        let answers = answers
            .iter()
            .filter_map(|(key, value)| answer_text(value).map(|text| (label(key), text)))
            .collect();

        Self {
            ticket_number: ticket.ticket_number.clone(),
            disputant,
            email: ticket.email.clone(),
            ticket_date: ticket.ticket_date,
            hearing_location: hearing_location.to_string(),
            hearing_attendance: ticket.hearing_attendance.clone(),
            dispute_type: ticket.dispute_type.clone(),
            submitted: ticket.created_date,
            answers,
        }
    }

    /// Labelled fields in print order
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("Ticket number".to_string(), self.ticket_number.clone()),
            ("Ticket date".to_string(), self.ticket_date.format("%B %-d, %Y").to_string()),
            ("Disputant".to_string(), self.disputant.clone()),
            ("Email".to_string(), self.email.clone()),
            ("Hearing location".to_string(), self.hearing_location.clone()),
            ("Hearing attendance".to_string(), label(&self.hearing_attendance)),
            ("Dispute type".to_string(), label(&self.dispute_type)),
            (
                "Submitted".to_string(),
                self.submitted.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
        ];
        fields.extend(self.answers.iter().cloned());
        fields
    }
}

/// `hearingAttendancePhone` -> `Hearing attendance phone`
fn label(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c == '_' || c == '-' {
            label.push(' ');
        } else if i == 0 {
            label.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            label.push(' ');
            label.extend(c.to_lowercase());
        } else {
            label.push(c);
        }
    }
    label
}

fn answer_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => match s.trim() {
            "y" => "Yes".to_string(),
            "n" => "No".to_string(),
            other => other.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .filter_map(answer_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(fields) => fields
            .iter()
            .filter_map(|(key, value)| answer_text(value).map(|text| format!("{}: {}", label(key), text)))
            .collect::<Vec<_>>()
            .join(", "),
    };

    (!text.is_empty()).then_some(text)
}
