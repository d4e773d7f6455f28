use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use checkin::{CheckinDesk, OverrideOutcome};
use storage::config::{load_config, TicketgateConfig};
use storage::records::TicketRecord;
use telemetry::init as telemetry_init;

mod session;

const DEFAULT_CONFIG: &str = "ticketgate.toml";

const CONFIG_TEMPLATE: &str = r#"[dataset]
path = "tickets.csv"

[overlay]
enabled = true
dir = "./data"

[admin]
pin = "2050"

[audit]
path = "./data/audit.jsonl"
rotate_bytes = 1048576

[log]
level = "info"
"#;

#[derive(Parser)]
#[command(name = "ticketgate", version, about = "Ticket check-in desk")]
struct Cli {
    /// Config file; defaults to ./ticketgate.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Ticket and attendee counts
    Status { #[arg(long)] json: bool },
    /// Print every ticket
    List { #[arg(long)] json: bool },
    /// Check a ticket in by id and name
    Verify {
        #[arg(long)]
        ticket_id: String,
        #[arg(long)]
        name: String,
    },
    /// Check a ticket in from decoded QR text (read from stdin when omitted)
    Scan { payload: Option<String> },
    /// Produce the QR payload for a ticket
    Generate {
        #[arg(long)]
        ticket_id: String,
        #[arg(long)]
        name: String,
        /// Also write the payload to <dir>/<name>_<id>_QR.json
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// Admin: search tickets by id, name or email
    Search {
        #[arg(long)]
        pin: String,
        #[arg(default_value = "")]
        query: String,
    },
    /// Admin: overwrite a ticket's attendance
    SetAttendance {
        #[arg(long)]
        pin: String,
        #[arg(long)]
        ticket_id: String,
        #[arg(long, action = ArgAction::Set)]
        attended: bool,
    },
    /// Admin: show what a QR payload contains without checking it in
    AdminScan {
        #[arg(long)]
        pin: String,
        payload: String,
    },
    /// Export the ticket database (or the audit log) as CSV
    Export {
        #[arg(long)]
        audit: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Reload the dataset, discarding in-memory edits
    Reset {
        #[arg(long)]
        clear_overlay: bool,
    },
    /// Interactive desk reading commands from stdin
    Session,
}

fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<TicketgateConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG).exists() => PathBuf::from(DEFAULT_CONFIG),
        None => return Ok(TicketgateConfig::default()),
    };
    let path = path.to_string_lossy().into_owned();
    load_config(&path).with_context(|| format!("loading config {path}"))
}

pub(crate) fn print_table(records: &[&TicketRecord]) {
    if records.is_empty() {
        println!("No tickets available.");
        return;
    }
    println!("{:<12} {:<24} {:<8} {}", "Ticket ID", "Name", "Attended", "Email");
    for r in records {
        let attended = if r.attended { "Yes" } else { "No" };
        println!("{:<12} {:<24} {:<8} {}", r.ticket_id, r.name, attended, r.email.as_deref().unwrap_or(""));
    }
}

pub(crate) fn print_summary(desk: &CheckinDesk) {
    let s = desk.summary();
    println!("Total Tickets: {}, Attendees: {}", s.total, s.attended);
}

fn write_or_print(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref());
    telemetry_init(cfg.as_ref().map(|c| c.log.level.as_str()).unwrap_or("info"));
    let cfg = cfg?;

    if let Commands::Init { path, force } = &cli.cmd {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        std::fs::write(path, CONFIG_TEMPLATE)?;
        info!("wrote starter config to {}", path.display());
        return Ok(());
    }

    let mut desk = CheckinDesk::from_config(&cfg);
    desk.load().await;

    match cli.cmd {
        Commands::Init { .. } => unreachable!("handled before the desk is loaded"),
        Commands::Status { json } => {
            if json {
                println!("{}", serde_json::to_string(&desk.summary())?);
            } else {
                print_summary(&desk);
            }
        }
        Commands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(desk.store().records())?);
            } else {
                print_table(&desk.store().records().iter().collect::<Vec<_>>());
                print_summary(&desk);
            }
        }
        Commands::Verify { ticket_id, name } => {
            let outcome = desk.verify_manual(&ticket_id, &name)?;
            println!("{outcome}");
        }
        Commands::Scan { payload } => {
            let payload = match payload {
                Some(p) => p,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            println!("{}", desk.scan(&payload));
        }
        Commands::Generate { ticket_id, name, save_dir } => {
            println!("{}", desk.generate_qr(&ticket_id, &name)?);
            if let Some(dir) = save_dir {
                let path = desk.save_qr(&dir)?;
                println!("saved {}", path.display());
            }
        }
        Commands::Search { pin, query } => {
            let session = desk.admin_login(&pin)?;
            print_table(&desk.search(&session, &query));
        }
        Commands::SetAttendance { pin, ticket_id, attended } => {
            let session = desk.admin_login(&pin)?;
            match desk.admin_override(&session, &ticket_id, attended) {
                OverrideOutcome::Updated => println!("{ticket_id}: attended = {attended}"),
                OverrideOutcome::NotFound => println!("{ticket_id}: ticket not found"),
            }
        }
        Commands::AdminScan { pin, payload } => {
            let session = desk.admin_login(&pin)?;
            let seen = desk.admin_scan(&session, &payload);
            println!("RAW QR Data: {}", seen.raw);
            match seen.claim {
                Some(c) => println!("Ticket ID: {}\nName: {}", c.ticket_id, c.name),
                None => println!("Could not parse JSON."),
            }
        }
        Commands::Export { audit, out } => {
            let text = if audit { desk.export_audit() } else { desk.export_tickets() };
            write_or_print(out.as_deref(), &text)?;
        }
        Commands::Reset { clear_overlay } => {
            desk.reset(clear_overlay).await;
            print_summary(&desk);
        }
        Commands::Session => session::run(&mut desk).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn config_template_is_valid() {
        let cfg = storage::config::parse_config(CONFIG_TEMPLATE).unwrap();
        assert_eq!(cfg.admin.pin.as_deref(), Some("2050"));
    }

    #[test]
    fn attendance_flag_takes_a_value() {
        let cli = Cli::try_parse_from(["ticketgate", "set-attendance", "--pin", "2050", "--ticket-id", "A1", "--attended", "false"]).unwrap();
        assert!(matches!(cli.cmd, Commands::SetAttendance { attended: false, .. }));
    }
}
