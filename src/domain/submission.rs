use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{EmailAddress, PersonName, TicketNumber};

/// Dispute form body exactly as the citizen-facing client posts it
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(default)]
    pub disputant_name: DisputantName,
    pub disputant_email: Option<String>,
    #[serde(default)]
    pub ticket_number: TicketNumberParts,
    pub ticket_date: Option<String>,
    /// Location id, sent either as a number or a numeric string
    pub hearing_location: Option<Value>,
    pub hearing_attendance: Option<String>,
    pub dispute_type: Option<String>,
    /// reCAPTCHA response token
    #[serde(skip_serializing)]
    pub captcha_response: Option<String>,
    /// Any other answers on the form, printed as-is on the PDF
    #[serde(flatten)]
    pub answers: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DisputantName {
    pub first: Option<String>,
    pub middle: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TicketNumberParts {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

/// A validated dispute, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicketResponse {
    pub first_name: PersonName,
    pub middle_name: Option<String>,
    pub last_name: PersonName,
    pub email: EmailAddress,
    pub ticket_number: TicketNumber,
    pub ticket_date: NaiveDate,
    pub hearing_location_id: i64,
    pub hearing_attendance: String,
    pub dispute_type: String,
}

impl TryFrom<&SubmissionPayload> for NewTicketResponse {
    type Error = String;

    fn try_from(payload: &SubmissionPayload) -> Result<Self, Self::Error> {
        let name = &payload.disputant_name;

        let first_name = required(&name.first, "first name")?
            .parse::<PersonName>()
            .map_err(|e| format!("Invalid first name: {}", e))?;
        let last_name = required(&name.last, "last name")?
            .parse::<PersonName>()
            .map_err(|e| format!("Invalid last name: {}", e))?;
        let middle_name = name
            .middle
            .as_deref()
            .map(str::trim)
            .filter(|middle| !middle.is_empty())
            .map(String::from);

        let email = required(&payload.disputant_email, "email")?.parse::<EmailAddress>()?;

        let ticket_number = TicketNumber::from_parts(
            payload.ticket_number.prefix.as_deref().unwrap_or_default(),
            payload.ticket_number.suffix.as_deref().unwrap_or_default(),
        )?;

        let ticket_date = parse_ticket_date(required(&payload.ticket_date, "ticket date")?)?;

        let hearing_location_id = payload
            .hearing_location
            .as_ref()
            .and_then(location_id)
            .ok_or_else(|| "Missing or invalid hearing location".to_string())?;

        let hearing_attendance =
            required(&payload.hearing_attendance, "hearing attendance")?.to_string();
        let dispute_type = required(&payload.dispute_type, "dispute type")?.to_string();

        Ok(Self {
            first_name,
            middle_name,
            last_name,
            email,
            ticket_number,
            ticket_date,
            hearing_location_id,
            hearing_attendance,
            dispute_type,
        })
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("Missing required field: {}", field))
}

/// Accepts a plain ISO date or a full RFC 3339 timestamp from date pickers
fn parse_ticket_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| format!("Invalid ticket date: {}", value))
}

fn location_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}
