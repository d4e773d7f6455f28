//! storage — ticket records, attendance overlay, audit trail and configuration

pub mod audit;
pub mod config;
pub mod overlay;
pub mod records;
pub mod rotation;
pub mod source;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use overlay::{FileKv, KeyValueStore, MemoryKv};
pub use records::{AttendanceOverlay, RecordStore, TicketRecord};
