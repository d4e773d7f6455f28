//! checkin::payload — text carried inside a ticket QR code
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identity claimed by a scanned or typed ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TicketClaim {
    pub ticket_id: String,
    pub name: String,
}

#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    #[error("invalid QR format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid QR format: expected a JSON object")]
    NotAnObject,
    #[error("please fill in both fields")]
    MissingField,
}

impl TicketClaim {
    /// Build a claim from user input, trimming both fields.
    pub fn new(ticket_id: &str, name: &str) -> Result<Self, PayloadError> {
        let (ticket_id, name) = (ticket_id.trim(), name.trim());
        if ticket_id.is_empty() || name.is_empty() { return Err(PayloadError::MissingField) }
        Ok(Self { ticket_id: ticket_id.to_string(), name: name.to_string() })
    }

    /// Decode untrusted scanner output.
    pub fn decode(text: &str) -> Result<Self, PayloadError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())?;
        if !value.is_object() { return Err(PayloadError::NotAnObject) }
        Ok(serde_json::from_value(value)?)
    }

    /// JSON text to hand to a QR encoder.
    pub fn encode(&self) -> String {
        let (id, name) = (serde_json::Value::from(self.ticket_id.as_str()), serde_json::Value::from(self.name.as_str()));
        format!(r#"{{"ticketId":{id},"name":{name}}}"#)
    }

    /// `<name>_<ticketId>_QR.json` inside `dir`.
    pub fn file_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_{}_QR.json", self.name, self.ticket_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_camel_case_keys() {
        let claim = TicketClaim::new(" A1 ", "Alice ").unwrap();
        assert_eq!(claim.encode(), r#"{"ticketId":"A1","name":"Alice"}"#);
        assert_eq!(TicketClaim::decode(&claim.encode()).unwrap(), claim);
        let quoted = TicketClaim::new("A2", "Zoë \"Z\"").unwrap();
        assert_eq!(TicketClaim::decode(&quoted.encode()).unwrap(), quoted);
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in ["", "A1,Alice", "[]", r#"["A1","Alice"]"#, r#"{"ticketId":"A1"}"#, r#"{"ticketId":1,"name":"Alice"}"#, r#"{"ticketId":"A1","name":"Alice","vip":true}"#] {
            assert!(matches!(TicketClaim::decode(bad), Err(PayloadError::Format(_) | PayloadError::NotAnObject)), "{bad}");
        }
    }

    #[test]
    fn blank_fields_are_refused() {
        assert!(matches!(TicketClaim::new("A1", "   "), Err(PayloadError::MissingField)));
        assert!(matches!(TicketClaim::new("", "Alice"), Err(PayloadError::MissingField)));
    }

    #[test]
    fn qr_file_name_follows_name_then_id() {
        let claim = TicketClaim::new("A1", "Alice").unwrap();
        assert_eq!(claim.file_in(Path::new("out")), Path::new("out").join("Alice_A1_QR.json"));
    }
}
