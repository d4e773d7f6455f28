//! checkin::desk — the check-in desk: owns the ticket store, overlay, audit trail and PIN gate
//!
//! Every front end holds one `CheckinDesk` and goes through these methods; nothing
//! else mutates the store. Attendance moves one way (unverified to verified) through
//! [`CheckinDesk::verify`]; only [`CheckinDesk::admin_override`] can move it back.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use storage::audit::{AuditAction, AuditLog};
use storage::config::TicketgateConfig;
use storage::overlay::{clear_overlay, load_overlay, save_overlay, FileKv, KeyValueStore};
use storage::records::{RecordStore, TicketRecord};
use storage::source::{fetch_dataset, fetch_dataset_blocking};

use crate::admin::{AdminError, AdminSession, PinGate};
use crate::outcome::{Outcome, OverrideOutcome};
use crate::payload::{PayloadError, TicketClaim};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary { pub total: usize, pub attended: usize }

/// What the admin scanner saw: the raw text and, if it parsed, the claim inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInspection { pub raw: String, pub claim: Option<TicketClaim> }

pub struct CheckinDesk {
    dataset: PathBuf,
    store: RecordStore,
    audit: AuditLog,
    overlay: Option<Box<dyn KeyValueStore>>,
    gate: PinGate,
    last_generated: Option<TicketClaim>,
}

impl CheckinDesk {
    /// Desk with an empty store, in-memory audit trail and no overlay. Call
    /// [`load`](Self::load) before verifying: until then every ticket is `NotFound`.
    pub fn new(dataset: impl Into<PathBuf>, gate: PinGate) -> Self {
        Self {
            dataset: dataset.into(),
            store: RecordStore::empty(),
            audit: AuditLog::in_memory(),
            overlay: None,
            gate,
            last_generated: None,
        }
    }

    pub fn with_overlay(mut self, kv: Box<dyn KeyValueStore>) -> Self { self.overlay = Some(kv); self }

    pub fn with_audit(mut self, audit: AuditLog) -> Self { self.audit = audit; self }

    pub fn from_config(cfg: &TicketgateConfig) -> Self {
        let mut desk = Self::new(&cfg.dataset.path, PinGate::from_config(&cfg.admin));
        if cfg.overlay.enabled {
            desk = desk.with_overlay(Box::new(FileKv::new(&cfg.overlay.dir)));
        }
        if let Some(path) = &cfg.audit.path {
            desk = desk.with_audit(AuditLog::open(path, cfg.audit.rotate_bytes));
        }
        desk
    }

    pub async fn load(&mut self) {
        let (store, ok) = fetch_dataset(&self.dataset).await;
        self.install(store);
        self.record_load(AuditAction::Load, ok, "");
    }

    pub fn load_blocking(&mut self) {
        let (store, ok) = fetch_dataset_blocking(&self.dataset);
        self.install(store);
        self.record_load(AuditAction::Load, ok, "");
    }

    /// Re-fetch the dataset, dropping in-memory edits. The overlay is re-applied
    /// unless `clear` asks for it to be wiped first.
    pub async fn reset(&mut self, clear: bool) {
        if clear { self.clear_overlay(); }
        let (store, ok) = fetch_dataset(&self.dataset).await;
        self.install(store);
        self.record_load(AuditAction::Reset, ok, if clear { " Attendance overlay cleared." } else { "" });
    }

    pub fn reset_blocking(&mut self, clear: bool) {
        if clear { self.clear_overlay(); }
        let (store, ok) = fetch_dataset_blocking(&self.dataset);
        self.install(store);
        self.record_load(AuditAction::Reset, ok, if clear { " Attendance overlay cleared." } else { "" });
    }

    fn install(&mut self, mut store: RecordStore) {
        if let Some(kv) = self.overlay.as_deref() {
            store.merge(&load_overlay(kv));
        }
        self.store = store;
    }

    fn record_load(&mut self, action: AuditAction, ok: bool, suffix: &str) {
        let msg = if ok {
            format!("Loaded {} ticket(s) from {}.{suffix}", self.store.total(), self.dataset.display())
        } else {
            format!("Could not read {}; no tickets loaded.{suffix}", self.dataset.display())
        };
        self.audit.record(action, None, None, msg);
    }

    fn clear_overlay(&mut self) {
        if let Some(kv) = self.overlay.as_deref_mut() {
            match clear_overlay(kv) {
                Ok(()) => info!("attendance overlay cleared"),
                Err(e) => error!("failed to clear attendance overlay: {e:#}"),
            }
        }
    }

    fn persist_overlay(&mut self) {
        if let Some(kv) = self.overlay.as_deref_mut() {
            if let Err(e) = save_overlay(kv, &self.store.snapshot()) {
                error!("failed to persist attendance overlay: {e:#}");
            }
        }
    }

    /// Check a ticket in. Only an unattended ticket matching both fields is mutated.
    pub fn verify(&mut self, ticket_id: &str, name: &str) -> Outcome {
        let outcome = match self.store.find_mut(ticket_id, name) {
            None => Outcome::NotFound,
            Some(rec) if rec.attended => Outcome::AlreadyUsed,
            Some(rec) => { rec.attended = true; Outcome::Accepted }
        };
        debug!(ticket_id, name, ?outcome, "verify");
        self.audit.record(AuditAction::Verify, Some(ticket_id), Some(name), outcome.audit_message());
        if outcome.is_accepted() { self.persist_overlay(); }
        outcome
    }

    pub fn verify_claim(&mut self, claim: &TicketClaim) -> Outcome { self.verify(&claim.ticket_id, &claim.name) }

    /// Typed-in verification; both fields are trimmed and required.
    pub fn verify_manual(&mut self, ticket_id: &str, name: &str) -> Result<Outcome, PayloadError> {
        let claim = TicketClaim::new(ticket_id, name)?;
        Ok(self.verify_claim(&claim))
    }

    /// Verify decoded scanner text. Malformed payloads never reach [`verify`](Self::verify).
    pub fn scan(&mut self, decoded: &str) -> Outcome {
        match TicketClaim::decode(decoded) {
            Ok(claim) => self.verify_claim(&claim),
            Err(e) => {
                debug!("rejected scan payload: {e}");
                self.audit.record(AuditAction::Scan, None, None, Outcome::InvalidFormat.audit_message());
                Outcome::InvalidFormat
            }
        }
    }

    pub fn admin_login(&mut self, pin: &str) -> Result<AdminSession, AdminError> {
        let checked = self.gate.check(pin);
        match &checked {
            Ok(_) => {
                info!("admin unlocked");
                self.audit.record(AuditAction::AdminLogin, None, None, "Admin view unlocked.");
            }
            Err(e) => {
                warn!("admin PIN rejected");
                self.audit.record(AuditAction::AdminLoginFailed, None, None, e.to_string());
            }
        }
        checked
    }

    /// Overwrite attendance by ticket id alone, bypassing the one-way verify path.
    pub fn admin_override(&mut self, _session: &AdminSession, ticket_id: &str, attended: bool) -> OverrideOutcome {
        let name = self.store.find_by_id(ticket_id).map(|r| r.name.clone());
        let outcome = if self.store.set_attended(ticket_id, attended) { OverrideOutcome::Updated } else { OverrideOutcome::NotFound };
        let msg = match outcome {
            OverrideOutcome::Updated => format!("Attendance set to {}.", if attended { "Yes" } else { "No" }),
            OverrideOutcome::NotFound => Outcome::NotFound.audit_message().to_string(),
        };
        self.audit.record(AuditAction::AttendanceEdit, Some(ticket_id), name.as_deref(), msg);
        if outcome == OverrideOutcome::Updated { self.persist_overlay(); }
        outcome
    }

    pub fn search(&mut self, _session: &AdminSession, query: &str) -> Vec<&TicketRecord> {
        let hits = self.store.search(query);
        self.audit.record(AuditAction::Search, None, None, format!("Search for \"{query}\" matched {} ticket(s).", hits.len()));
        hits
    }

    /// Show what a scanned code holds without verifying it.
    pub fn admin_scan(&mut self, _session: &AdminSession, decoded: &str) -> ScanInspection {
        let claim = TicketClaim::decode(decoded).ok();
        self.audit.record(
            AuditAction::Scan,
            claim.as_ref().map(|c| c.ticket_id.as_str()),
            claim.as_ref().map(|c| c.name.as_str()),
            "Scanned in Admin",
        );
        ScanInspection { raw: decoded.to_string(), claim }
    }

    /// Build the QR payload for a ticket and remember it for [`save_qr`](Self::save_qr).
    pub fn generate_qr(&mut self, ticket_id: &str, name: &str) -> Result<String, PayloadError> {
        let claim = TicketClaim::new(ticket_id, name)?;
        let payload = claim.encode();
        self.audit.record(AuditAction::GenerateQr, Some(&claim.ticket_id), Some(&claim.name), "QR code generated.");
        self.last_generated = Some(claim);
        Ok(payload)
    }

    pub fn save_qr(&mut self, dir: &Path) -> Result<PathBuf> {
        let Some(claim) = self.last_generated.clone() else { bail!("No QR code generated yet!") };
        fs::create_dir_all(dir)?;
        let path = claim.file_in(dir);
        fs::write(&path, claim.encode())?;
        self.audit.record(AuditAction::SaveQr, Some(&claim.ticket_id), Some(&claim.name), format!("QR payload saved to {}.", path.display()));
        Ok(path)
    }

    pub fn export_tickets(&mut self) -> String {
        self.audit.record(AuditAction::Export, None, None, "Ticket database exported.");
        self.store.serialize()
    }

    pub fn export_audit(&mut self) -> String {
        self.audit.record(AuditAction::Export, None, None, "Audit log exported.");
        self.audit.to_csv()
    }

    pub fn navigate(&mut self, view: &str) {
        self.audit.record(AuditAction::Navigation, None, None, format!("Opened {view} view."));
    }

    pub fn store(&self) -> &RecordStore { &self.store }
    pub fn audit(&self) -> &AuditLog { &self.audit }
    pub fn last_generated(&self) -> Option<&TicketClaim> { self.last_generated.as_ref() }
    pub fn summary(&self) -> Summary { Summary { total: self.store.total(), attended: self.store.attended_count() } }
}
