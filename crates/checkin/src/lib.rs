//! checkin — attendance verification for ticketgate

pub mod admin;
pub mod desk;
pub mod outcome;
pub mod payload;

pub use admin::{AdminError, AdminSession, PinGate};
pub use desk::{CheckinDesk, ScanInspection, Summary};
pub use outcome::{Outcome, OverrideOutcome};
pub use payload::{PayloadError, TicketClaim};
