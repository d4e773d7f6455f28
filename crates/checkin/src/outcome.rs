use serde::Serialize;
use std::fmt;

/// Result of a verification attempt. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    AlreadyUsed,
    NotFound,
    InvalidFormat,
}

impl Outcome {
    /// Text written to the audit trail.
    pub fn audit_message(&self) -> &'static str {
        match self {
            Self::Accepted => "Ticket verified successfully.",
            Self::AlreadyUsed => "Ticket already used.",
            Self::NotFound => "Ticket not found.",
            Self::InvalidFormat => "Invalid QR format.",
        }
    }

    /// Text shown at the door.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Accepted => "Valid ticket! Attendee marked as attended.",
            Self::AlreadyUsed => "Ticket already used!",
            Self::NotFound => "Ticket not found in the database!",
            Self::InvalidFormat => "Invalid QR format!",
        }
    }

    pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted) }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.banner()) }
}

/// Result of an admin attendance overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideOutcome {
    Updated,
    NotFound,
}
