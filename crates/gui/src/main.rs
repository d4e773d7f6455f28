use std::path::Path;

use iced::widget::{button, column, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Sandbox, Settings, Theme};
use tracing::error;

use checkin::{AdminSession, CheckinDesk, OverrideOutcome};
use storage::config::{load_config, TicketgateConfig};
use storage::records::TicketRecord;

pub fn main() -> iced::Result { DeskApp::run(Settings::default()) }

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
enum Tab { #[default] Tickets, Verify, Admin }

struct DeskApp {
    desk: CheckinDesk,
    tab: Tab,
    ticket_id: String,
    name: String,
    payload: String,
    verify_output: String,
    pin: String,
    admin: Option<AdminSession>,
    admin_output: String,
    query: String,
    results: Vec<TicketRecord>,
}

#[derive(Debug, Clone)]
enum Message {
    SwitchTickets, SwitchVerify, SwitchAdmin,
    TicketIdChanged(String), NameChanged(String), PayloadChanged(String),
    VerifyManual, VerifyPayload, GenerateQr, SaveQr, Reset,
    PinChanged(String), Unlock,
    QueryChanged(String), Search, SetAttended(bool), Inspect, ExportTickets, ExportAudit,
}

fn desk_config() -> TicketgateConfig {
    if !Path::new("ticketgate.toml").exists() { return TicketgateConfig::default() }
    load_config("ticketgate.toml").unwrap_or_else(|e| {
        error!("ticketgate.toml unusable, falling back to defaults: {e}");
        TicketgateConfig::default()
    })
}

fn ticket_rows<'a>(records: impl Iterator<Item = &'a TicketRecord>) -> Element<'a, Message> {
    let mut rows = vec![row![text("Ticket ID").width(120), text("Name").width(220), text("Attended")].into()];
    rows.extend(records.map(|r| {
        row![text(&r.ticket_id).width(120), text(&r.name).width(220), text(if r.attended { "Yes" } else { "No" })].into()
    }));
    scrollable(Column::with_children(rows).spacing(4)).into()
}

impl DeskApp {
    fn with_desk(desk: CheckinDesk) -> Self {
        Self {
            desk, tab: Tab::default(), ticket_id: String::new(), name: String::new(), payload: String::new(),
            verify_output: String::new(), pin: String::new(), admin: None, admin_output: String::new(),
            query: String::new(), results: Vec::new(),
        }
    }

    fn export(&mut self, file: &str, audit: bool) {
        let csv = if audit { self.desk.export_audit() } else { self.desk.export_tickets() };
        self.admin_output = match std::fs::write(file, csv) {
            Ok(()) => format!("exported {file}"),
            Err(e) => format!("could not write {file}: {e}"),
        };
    }
}

impl Sandbox for DeskApp {
    type Message = Message;
    fn new() -> Self {
        let cfg = desk_config();
        telemetry::init(&cfg.log.level);
        let mut desk = CheckinDesk::from_config(&cfg);
        desk.load_blocking();
        Self::with_desk(desk)
    }
    fn title(&self) -> String { "ticketgate — check-in desk".into() }
    fn theme(&self) -> Theme { Theme::Dark }
    fn update(&mut self, msg: Message) {
        match msg {
            Message::SwitchTickets => { self.tab = Tab::Tickets; self.desk.navigate("tickets"); }
            Message::SwitchVerify => { self.tab = Tab::Verify; self.desk.navigate("verify"); }
            Message::SwitchAdmin => { self.tab = Tab::Admin; self.desk.navigate("admin"); }
            Message::TicketIdChanged(s) => self.ticket_id = s,
            Message::NameChanged(s) => self.name = s,
            Message::PayloadChanged(s) => self.payload = s,
            Message::VerifyManual => {
                self.verify_output = match self.desk.verify_manual(&self.ticket_id, &self.name) {
                    Ok(outcome) => outcome.to_string(),
                    Err(e) => e.to_string(),
                };
            }
            Message::VerifyPayload => {
                self.verify_output = self.desk.scan(&self.payload).to_string();
                self.payload.clear();
            }
            Message::GenerateQr => {
                self.verify_output = match self.desk.generate_qr(&self.ticket_id, &self.name) {
                    Ok(payload) => { self.ticket_id.clear(); self.name.clear(); payload }
                    Err(e) => e.to_string(),
                };
            }
            Message::SaveQr => {
                self.verify_output = match self.desk.save_qr(Path::new("qr")) {
                    Ok(path) => format!("saved {}", path.display()),
                    Err(e) => e.to_string(),
                };
            }
            Message::Reset => self.desk.reset_blocking(false),
            Message::PinChanged(s) => self.pin = s,
            Message::Unlock => {
                match self.desk.admin_login(&self.pin) {
                    Ok(session) => {
                        self.results = self.desk.store().records().to_vec();
                        self.admin = Some(session);
                        self.admin_output.clear();
                    }
                    Err(e) => self.admin_output = e.to_string(),
                }
                self.pin.clear();
            }
            Message::QueryChanged(s) => self.query = s,
            Message::Search => {
                if let Some(session) = &self.admin {
                    self.results = self.desk.search(session, &self.query).into_iter().cloned().collect();
                }
            }
            Message::SetAttended(attended) => {
                if let Some(session) = &self.admin {
                    let id = self.query.trim().to_string();
                    self.admin_output = match self.desk.admin_override(session, &id, attended) {
                        OverrideOutcome::Updated => format!("{id}: attended = {}", if attended { "Yes" } else { "No" }),
                        OverrideOutcome::NotFound => format!("{id}: ticket not found"),
                    };
                }
            }
            Message::Inspect => {
                if let Some(session) = &self.admin {
                    let seen = self.desk.admin_scan(session, &self.payload);
                    self.admin_output = match seen.claim {
                        Some(c) => format!("RAW QR Data: {}\nTicket ID: {}\nName: {}", seen.raw, c.ticket_id, c.name),
                        None => format!("RAW QR Data: {}\nCould not parse JSON.", seen.raw),
                    };
                }
            }
            Message::ExportTickets => self.export("ticket_database.csv", false),
            Message::ExportAudit => self.export("audit_log.csv", true),
        }
    }
    fn view(&self) -> Element<Message> {
        let tabs = row![
            button("Tickets").on_press(Message::SwitchTickets),
            button("Verify").on_press(Message::SwitchVerify),
            button("Admin").on_press(Message::SwitchAdmin),
        ].spacing(10);

        let summary = self.desk.summary();
        let content: Element<_> = match self.tab {
            Tab::Tickets => column![
                text(format!("Total Tickets: {}, Attendees: {}", summary.total, summary.attended)).size(20),
                button("Reload database").on_press(Message::Reset),
                ticket_rows(self.desk.store().records().iter()),
            ].align_items(Alignment::Start).spacing(12).into(),
            Tab::Verify => column![
                text_input("Ticket ID", &self.ticket_id).on_input(Message::TicketIdChanged),
                text_input("Attendee name", &self.name).on_input(Message::NameChanged),
                row![
                    button("Verify").on_press(Message::VerifyManual),
                    button("Generate QR").on_press(Message::GenerateQr),
                    button("Save QR").on_press(Message::SaveQr),
                ].spacing(8),
                text_input("Scanned QR text", &self.payload).on_input(Message::PayloadChanged).on_submit(Message::VerifyPayload),
                button("Verify scan").on_press(Message::VerifyPayload),
                text(&self.verify_output),
            ].spacing(8).into(),
            Tab::Admin if self.admin.is_none() => column![
                text("Enter admin PIN:"),
                text_input("PIN", &self.pin).on_input(Message::PinChanged).password().on_submit(Message::Unlock),
                button("Unlock").on_press(Message::Unlock),
                text(&self.admin_output),
            ].spacing(8).into(),
            Tab::Admin => column![
                text_input("Search, or ticket ID to edit", &self.query).on_input(Message::QueryChanged).on_submit(Message::Search),
                row![
                    button("Search").on_press(Message::Search),
                    button("Mark attended").on_press(Message::SetAttended(true)),
                    button("Mark not attended").on_press(Message::SetAttended(false)),
                ].spacing(8),
                text_input("Scanned QR text", &self.payload).on_input(Message::PayloadChanged),
                row![
                    button("Inspect scan").on_press(Message::Inspect),
                    button("Export CSV").on_press(Message::ExportTickets),
                    button("Export audit log").on_press(Message::ExportAudit),
                ].spacing(8),
                text(&self.admin_output),
                ticket_rows(self.results.iter()),
            ].spacing(8).into(),
        };
        column![tabs, content].spacing(16).padding(16).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin::PinGate;

    fn app() -> (tempfile::TempDir, DeskApp) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tickets.csv");
        std::fs::write(&path, "Ticket ID,Name,Attended\nA1,Alice,false\nA2,Bob,true\n").unwrap();
        let mut desk = CheckinDesk::new(path, PinGate::from_pin("2050"));
        desk.load_blocking();
        (tmp, DeskApp::with_desk(desk))
    }

    #[test]
    fn unlocking_shows_every_ticket() {
        let (_tmp, mut app) = app();
        app.update(Message::PinChanged("2050".into()));
        app.update(Message::Unlock);
        assert!(app.admin.is_some());
        let ids: Vec<_> = app.results.iter().map(|r| r.ticket_id.as_str()).collect();
        assert_eq!(ids, ["A1", "A2"]);
    }

    #[test]
    fn wrong_pin_leaves_dashboard_empty() {
        let (_tmp, mut app) = app();
        app.update(Message::PinChanged("1234".into()));
        app.update(Message::Unlock);
        assert!(app.admin.is_none());
        assert!(app.results.is_empty());
        assert_eq!(app.admin_output, "Incorrect PIN!");
    }
}
