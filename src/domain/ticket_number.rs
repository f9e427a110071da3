use std::fmt;

/// A traffic ticket number, always upper-cased
#[derive(Debug, Clone, PartialEq)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Join the prefix and suffix the citizen typed into one ticket number
    pub fn from_parts(prefix: &str, suffix: &str) -> Result<Self, String> {
        let value = format!("{}{}", prefix, suffix);

        if value.trim().is_empty() {
            return Err("Ticket number cannot be empty".into());
        }

        Ok(Self(value.to_uppercase()))
    }
}

impl AsRef<str> for TicketNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
