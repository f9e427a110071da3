mod email_address;
mod person_name;
mod submission;
mod ticket_number;

pub use email_address::EmailAddress;
pub use person_name::PersonName;
pub use submission::{DisputantName, NewTicketResponse, SubmissionPayload, TicketNumberParts};
pub use ticket_number::TicketNumber;
