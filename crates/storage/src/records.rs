//! storage::records — ticket record store parsed from the positional CSV dataset
//!
//! The dataset format has no quoting: a comma inside a name or email shifts every
//! following column. That is a known limitation of the format, not something the
//! parser tries to guess around.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Header written when the source has none (empty text or failed fetch).
pub const DEFAULT_HEADER: &str = "Ticket ID,Name,Attended";

/// Mapping of ticket id to attendance, persisted separately from the dataset.
pub type AttendanceOverlay = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: String,
    pub name: String,
    pub attended: bool,
    /// Only present in datasets with a fourth column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TicketRecord {
    pub fn new(ticket_id: &str, name: &str) -> Self {
        Self { ticket_id: ticket_id.to_string(), name: name.to_string(), attended: false, email: None }
    }

    fn from_line(line: &str) -> Self {
        let mut cols = line.split(',');
        let ticket_id = cols.next().unwrap_or_default().to_string();
        let name = cols.next().unwrap_or_default().to_string();
        let attended = cols.next() == Some("true");
        let email = cols.next().map(str::to_string);
        Self { ticket_id, name, attended, email }
    }

    fn to_line(&self) -> String {
        let mut line = format!("{},{},{}", self.ticket_id, self.name, self.attended);
        if let Some(email) = &self.email {
            line.push(',');
            line.push_str(email);
        }
        line
    }

    fn matches(&self, needle: &str) -> bool {
        self.ticket_id.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.email.as_deref().is_some_and(|e| e.to_lowercase().contains(needle))
    }
}

/// Ordered ticket list plus the header line it was parsed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    header: String,
    records: Vec<TicketRecord>,
}

impl Default for RecordStore {
    fn default() -> Self { Self::empty() }
}

impl RecordStore {
    /// Header-only store, used before a load completes and after a failed fetch.
    pub fn empty() -> Self { Self { header: DEFAULT_HEADER.to_string(), records: Vec::new() } }

    /// Parse dataset text. Never fails: blank lines are skipped (leading ones too, so
    /// the header is the first non-blank line) and short rows read their missing
    /// columns as empty.
    pub fn parse(text: &str) -> Self {
        let mut lines = text
            .lines()
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .filter(|l| !l.trim().is_empty());
        let Some(header) = lines.next() else { return Self::empty() };
        let header = header.to_string();
        let records = lines.map(TicketRecord::from_line).collect();
        Self { header, records }
    }

    /// Turn a fetch result into a store, substituting an empty one on failure.
    pub fn from_fetch<E: std::fmt::Display>(fetched: Result<String, E>) -> Self {
        match fetched {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                warn!("dataset fetch failed, continuing with an empty ticket list: {e}");
                Self::empty()
            }
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.header.len() + 1 + self.records.len() * 32);
        out.push_str(&self.header);
        out.push('\n');
        for rec in &self.records {
            out.push_str(&rec.to_line());
            out.push('\n');
        }
        out
    }

    /// Overwrite `attended` for every record named in the overlay.
    pub fn merge(&mut self, overlay: &AttendanceOverlay) {
        for rec in &mut self.records {
            if let Some(&attended) = overlay.get(&rec.ticket_id) {
                rec.attended = attended;
            }
        }
    }

    /// Full `ticket_id -> attended` mapping for every record.
    pub fn snapshot(&self) -> AttendanceOverlay {
        self.records.iter().map(|r| (r.ticket_id.clone(), r.attended)).collect()
    }

    /// First record matching both fields exactly.
    pub fn find(&self, ticket_id: &str, name: &str) -> Option<&TicketRecord> {
        self.records.iter().find(|r| r.ticket_id == ticket_id && r.name == name)
    }

    pub fn find_mut(&mut self, ticket_id: &str, name: &str) -> Option<&mut TicketRecord> {
        self.records.iter_mut().find(|r| r.ticket_id == ticket_id && r.name == name)
    }

    pub fn find_by_id(&self, ticket_id: &str) -> Option<&TicketRecord> {
        self.records.iter().find(|r| r.ticket_id == ticket_id)
    }

    /// Direct overwrite by id; returns false when no record has that id.
    pub fn set_attended(&mut self, ticket_id: &str, attended: bool) -> bool {
        match self.records.iter_mut().find(|r| r.ticket_id == ticket_id) {
            Some(rec) => { rec.attended = attended; true }
            None => false,
        }
    }

    /// Case-insensitive substring search over id, name and email.
    pub fn search(&self, query: &str) -> Vec<&TicketRecord> {
        let needle = query.to_lowercase();
        self.records.iter().filter(|r| r.matches(&needle)).collect()
    }

    pub fn header(&self) -> &str { &self.header }
    pub fn records(&self) -> &[TicketRecord] { &self.records }
    pub fn total(&self) -> usize { self.records.len() }
    pub fn attended_count(&self) -> usize { self.records.iter().filter(|r| r.attended).count() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Ticket ID,Name,Attended\nA1,Alice,false\nA2,Bob,true\n";

    #[test]
    fn parse_skips_header_and_reads_columns() {
        let store = RecordStore::parse(SAMPLE);
        assert_eq!(store.header(), DEFAULT_HEADER);
        assert_eq!(store.total(), 2);
        assert_eq!(store.records()[0], TicketRecord::new("A1", "Alice"));
        assert!(store.records()[1].attended);
        assert_eq!(store.attended_count(), 1);
    }

    #[test]
    fn non_literal_attended_reads_as_false() {
        let store = RecordStore::parse("Ticket ID,Name,Attended\nA1,Alice,yes\nA2,Bob,TRUE\nA3,Cy\n");
        assert!(store.records().iter().all(|r| !r.attended));
        assert_eq!(store.records()[2].name, "Cy");
    }

    #[test]
    fn empty_text_gives_header_only_store() {
        assert_eq!(RecordStore::parse(""), RecordStore::empty());
        assert_eq!(RecordStore::empty().serialize(), "Ticket ID,Name,Attended\n");
    }

    #[test]
    fn leading_blank_lines_before_header_are_skipped() {
        let store = RecordStore::parse("\n  \r\nTicket ID,Name,Attended\nA1,Alice,false\n");
        assert_eq!(store.header(), DEFAULT_HEADER);
        assert_eq!(store.total(), 1);
        assert_eq!(store.records()[0], TicketRecord::new("A1", "Alice"));
        assert_eq!(RecordStore::parse("\n \n"), RecordStore::empty());
    }

    #[test]
    fn failed_fetch_gives_header_only_store() {
        let store = RecordStore::from_fetch::<&str>(Err("connection refused"));
        assert!(store.is_empty());
        assert_eq!(store.header(), DEFAULT_HEADER);
    }

    #[test]
    fn email_column_is_preserved_verbatim() {
        let text = "Ticket ID,Name,Attended,Email\nA1,Alice,false,alice@example.org\nA2,Bob,true,\nA3,Cy,false\n";
        let store = RecordStore::parse(text);
        assert_eq!(store.records()[0].email.as_deref(), Some("alice@example.org"));
        assert_eq!(store.records()[1].email.as_deref(), Some(""));
        assert_eq!(store.records()[2].email, None);
        assert_eq!(store.serialize(), text);
    }

    #[test]
    fn crlf_lines_parse_like_lf() {
        let store = RecordStore::parse("Ticket ID,Name,Attended\r\nA1,Alice,true\r\n");
        assert!(store.records()[0].attended);
        assert_eq!(store.header(), DEFAULT_HEADER);
    }

    #[test]
    fn find_requires_exact_match_on_both_fields() {
        let store = RecordStore::parse(SAMPLE);
        assert!(store.find("A1", "Alice").is_some());
        assert!(store.find("A1", "alice").is_none());
        assert!(store.find("A1", "Bob").is_none());
    }

    #[test]
    fn find_returns_first_duplicate() {
        let store = RecordStore::parse("h\nA1,Alice,true\nA1,Alice,false\n");
        assert!(store.find("A1", "Alice").map(|r| r.attended).unwrap_or(false));
    }

    #[test]
    fn merge_only_touches_listed_records() {
        let mut store = RecordStore::parse(SAMPLE);
        let overlay = AttendanceOverlay::from([("A2".to_string(), false), ("ZZ".to_string(), true)]);
        store.merge(&overlay);
        assert!(!store.records()[0].attended);
        assert!(!store.records()[1].attended);
        assert_eq!(store.records()[1].name, "Bob");
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let store = RecordStore::parse("h\nA1,Alice,false,al@x.org\nB2,Bob,true\nC3,Carol,false,BOBBY@x.org\n");
        let ids: Vec<_> = store.search("bob").into_iter().map(|r| r.ticket_id.as_str()).collect();
        assert_eq!(ids, ["B2", "C3"]);
        let all: Vec<_> = store.search("").into_iter().map(|r| r.ticket_id.as_str()).collect();
        assert_eq!(all, ["A1", "B2", "C3"]);
        assert_eq!(store.search("a1")[0].name, "Alice");
    }

    #[test]
    fn set_attended_by_id() {
        let mut store = RecordStore::parse(SAMPLE);
        assert!(store.set_attended("A2", false));
        assert!(!store.set_attended("A9", true));
        assert_eq!(store.snapshot(), AttendanceOverlay::from([("A1".into(), false), ("A2".into(), false)]));
    }
}
