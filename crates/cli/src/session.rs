//! Interactive desk: one command per line on stdin, state kept for the whole session.
use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use checkin::{AdminSession, CheckinDesk, OverrideOutcome};

use crate::{print_summary, print_table};

const HELP: &str = "\
commands:
  verify <id> <name>        check a ticket in
  scan <payload>            check in from decoded QR text
  generate <id> <name>      build a QR payload
  save-qr <dir>             write the last generated payload
  list | status             show tickets / counts
  reset [--clear]           reload the dataset
  export tickets|audit <file>
  login <pin> | logout      admin access
  search [query]            admin: search tickets
  set <id> yes|no           admin: overwrite attendance
  inspect <payload>         admin: show QR contents
  help | quit";

/// Split off the first word; the remainder keeps inner spaces (names can have them).
fn word(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    }
}

pub async fn run(desk: &mut CheckinDesk) -> Result<()> {
    let mut admin: Option<AdminSession> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("ticketgate desk ready; type `help` for commands");
    while let Some(line) = lines.next_line().await? {
        let (cmd, rest) = word(&line);
        debug!(cmd, "session command");
        match cmd {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "list" => {
                print_table(&desk.store().records().iter().collect::<Vec<_>>());
                print_summary(desk);
            }
            "status" => print_summary(desk),
            "verify" => {
                let (id, name) = word(rest);
                match desk.verify_manual(id, name) {
                    Ok(outcome) => println!("{outcome}"),
                    Err(e) => println!("{e}"),
                }
            }
            "scan" => println!("{}", desk.scan(rest)),
            "generate" => {
                let (id, name) = word(rest);
                match desk.generate_qr(id, name) {
                    Ok(payload) => println!("{payload}"),
                    Err(e) => println!("{e}"),
                }
            }
            "save-qr" => match desk.save_qr(Path::new(if rest.is_empty() { "." } else { rest })) {
                Ok(path) => println!("saved {}", path.display()),
                Err(e) => println!("{e}"),
            },
            "reset" => {
                desk.reset(rest == "--clear").await;
                print_summary(desk);
            }
            "export" => {
                let (what, file) = word(rest);
                let text = match what {
                    "tickets" => desk.export_tickets(),
                    "audit" => desk.export_audit(),
                    _ => { println!("usage: export tickets|audit <file>"); continue; }
                };
                if file.is_empty() {
                    print!("{text}");
                } else if let Err(e) = std::fs::write(file, text) {
                    println!("could not write {file}: {e}");
                }
            }
            "login" => {
                desk.navigate("admin");
                match desk.admin_login(rest) {
                    Ok(session) => { admin = Some(session); println!("admin unlocked"); }
                    Err(e) => println!("{e}"),
                }
            }
            "logout" => {
                admin = None;
                desk.navigate("main");
            }
            "search" | "set" | "inspect" => {
                let Some(session) = admin.as_ref() else { println!("admin PIN required (login <pin>)"); continue };
                admin_command(desk, session, cmd, rest);
            }
            other => println!("unknown command `{other}`; type `help`"),
        }
    }
    Ok(())
}

fn admin_command(desk: &mut CheckinDesk, session: &AdminSession, cmd: &str, rest: &str) {
    match cmd {
        "search" => print_table(&desk.search(session, rest)),
        "set" => {
            let (id, value) = word(rest);
            let attended = match value {
                "yes" | "true" => true,
                "no" | "false" => false,
                _ => { println!("usage: set <id> yes|no"); return }
            };
            match desk.admin_override(session, id, attended) {
                OverrideOutcome::Updated => println!("{id}: attended = {}", if attended { "Yes" } else { "No" }),
                OverrideOutcome::NotFound => println!("{id}: ticket not found"),
            }
        }
        _ => {
            let seen = desk.admin_scan(session, rest);
            println!("RAW QR Data: {}", seen.raw);
            match seen.claim {
                Some(c) => println!("Ticket ID: {}\nName: {}", c.ticket_id, c.name),
                None => println!("Could not parse JSON."),
            }
        }
    }
}
