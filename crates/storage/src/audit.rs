//! storage::audit — append-only audit trail with CSV export and an optional file sink
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::rotation::{latest_rotated, rotate_if_needed};

pub const AUDIT_CSV_HEADER: &str = "Timestamp,Action,Ticket ID,Name,Message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    Load,
    Verify,
    GenerateQr,
    SaveQr,
    Export,
    Reset,
    AdminLogin,
    AdminLoginFailed,
    Search,
    Scan,
    Navigation,
    AttendanceEdit,
}

impl AuditAction {
    pub const ALL: [AuditAction; 12] = [
        Self::Load, Self::Verify, Self::GenerateQr, Self::SaveQr, Self::Export, Self::Reset,
        Self::AdminLogin, Self::AdminLoginFailed, Self::Search, Self::Scan, Self::Navigation,
        Self::AttendanceEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Verify => "verify",
            Self::GenerateQr => "generate-qr",
            Self::SaveQr => "save-qr",
            Self::Export => "export",
            Self::Reset => "reset",
            Self::AdminLogin => "admin-login",
            Self::AdminLoginFailed => "admin-login-failed",
            Self::Search => "search",
            Self::Scan => "scan",
            Self::Navigation => "navigation",
            Self::AttendanceEdit => "attendance-edit",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for AuditAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|a| a.as_str() == s).ok_or_else(|| format!("unknown audit action: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub ticket_id: Option<String>,
    pub name: Option<String>,
    pub message: String,
}

impl AuditEntry {
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.action,
            self.ticket_id.as_deref().unwrap_or(""),
            self.name.as_deref().unwrap_or(""),
            self.message,
        )
    }
}

#[derive(Debug, Clone)]
struct Sink { path: PathBuf, rotate_bytes: u64 }

impl Sink {
    /// One JSON object per line, so field text can never start a new entry.
    fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        rotate_if_needed(&self.path, self.rotate_bytes);
        if let Some(dir) = self.path.parent() { fs::create_dir_all(dir)?; }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(line.as_bytes())
    }
}

fn read_sink_file(path: &Path, into: &mut Vec<AuditEntry>) {
    let Ok(txt) = fs::read_to_string(path) else { return };
    for line in txt.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => into.push(entry),
            Err(e) => warn!("skipping unreadable audit line in {}: {e}", path.display()),
        }
    }
}

/// Ordered audit trail. Entries live for the process; with a sink they are also
/// appended to a file and read back on [`AuditLog::open`].
#[derive(Debug, Clone, Default)]
pub struct AuditLog { entries: Vec<AuditEntry>, sink: Option<Sink> }

impl AuditLog {
    pub fn in_memory() -> Self { Self::default() }

    /// Attach a sink file, seeding the log from the newest rotated file and the
    /// current one.
    pub fn open(path: &Path, rotate_bytes: u64) -> Self {
        let mut entries = Vec::new();
        if let Some(rotated) = latest_rotated(path) { read_sink_file(&rotated, &mut entries); }
        read_sink_file(path, &mut entries);
        Self { entries, sink: Some(Sink { path: path.to_path_buf(), rotate_bytes }) }
    }

    pub fn record(&mut self, action: AuditAction, ticket_id: Option<&str>, name: Option<&str>, message: impl Into<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            action,
            ticket_id: ticket_id.map(str::to_string),
            name: name.map(str::to_string),
            message: message.into(),
        };
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append(&entry) {
                error!("audit sink {} write failed: {e}", sink.path.display());
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn to_csv(&self) -> String {
        let mut csv = format!("{AUDIT_CSV_HEADER}\n");
        for e in &self.entries {
            csv.push_str(&e.to_csv_line());
            csv.push('\n');
        }
        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_are_kebab_case() {
        assert_eq!(AuditAction::AdminLoginFailed.to_string(), "admin-login-failed");
        assert_eq!("save-qr".parse::<AuditAction>(), Ok(AuditAction::SaveQr));
        assert!("teleport".parse::<AuditAction>().is_err());
        assert_eq!(serde_json::to_string(&AuditAction::AttendanceEdit).unwrap(), r#""attendance-edit""#);
    }

    #[test]
    fn csv_export_has_header_and_blank_optional_columns() {
        let mut log = AuditLog::in_memory();
        log.record(AuditAction::Verify, Some("A1"), Some("Alice"), "Ticket verified successfully.");
        log.record(AuditAction::Reset, None, None, "Dataset reloaded.");
        let csv = log.to_csv();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], AUDIT_CSV_HEADER);
        assert!(lines[1].ends_with(",verify,A1,Alice,Ticket verified successfully."));
        assert!(lines[2].ends_with(",reset,,,Dataset reloaded."));
    }

    #[test]
    fn sink_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("audit.jsonl");
        {
            let mut log = AuditLog::open(&path, 1 << 20);
            log.record(AuditAction::AdminLogin, None, None, "Admin unlocked, with PIN");
        }
        std::fs::write(&path, format!("{}garbage line\n", std::fs::read_to_string(&path).unwrap())).unwrap();
        let mut log = AuditLog::open(&path, 1 << 20);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "Admin unlocked, with PIN");
        log.record(AuditAction::Export, None, None, "Audit log exported.");
        assert_eq!(AuditLog::open(&path, 1 << 20).len(), 2);
    }

    #[test]
    fn hostile_field_text_cannot_forge_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audit.jsonl");
        let forged = "x\n2026-01-01T00:00:00.000Z,admin-login,,,Admin view unlocked.";
        {
            let mut log = AuditLog::open(&path, 1 << 20);
            log.record(AuditAction::Verify, Some("ZZ"), Some(forged), "Ticket not found.");
            log.record(AuditAction::Verify, Some("A1\r"), Some("Smith, John"), "Ticket not found.");
        }
        let log = AuditLog::open(&path, 1 << 20);
        assert_eq!(log.len(), 2);
        assert!(log.entries().iter().all(|e| e.action == AuditAction::Verify));
        assert_eq!(log.entries()[0].name.as_deref(), Some(forged));
        assert_eq!(log.entries()[1].ticket_id.as_deref(), Some("A1\r"));
        assert_eq!(log.entries()[1].name.as_deref(), Some("Smith, John"));
        assert_eq!(log.entries()[1].message, "Ticket not found.");
    }

    #[test]
    fn reopen_reads_the_rotated_trail_too() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audit.jsonl");
        {
            let mut log = AuditLog::open(&path, 64);
            log.record(AuditAction::Load, None, None, "Loaded 2 ticket(s) from tickets.csv.");
            // Past the threshold now: this append moves the first line aside.
            log.record(AuditAction::Verify, Some("A1"), Some("Alice"), "Ticket verified successfully.");
        }
        assert!(crate::rotation::latest_rotated(&path).is_some());
        let log = AuditLog::open(&path, 64);
        let actions: Vec<_> = log.entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, [AuditAction::Load, AuditAction::Verify]);
    }
}
