use anyhow::{bail, Context, Result};
use bday_core::{
    group_by_section, plan_batch, upcoming, BirthdayScheduler, ContactSnapshot, PassStatus,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod calendar;
mod config;
mod outbox;
mod state;

use config::Config;
use outbox::FileOutbox;

#[derive(Parser, Debug)]
#[command(
    name = "bday",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BDAY_BUILD_SHA"), ")"),
    about = "Birthday reminder scheduler"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.bday/config.toml
    Init,

    /// Show the nearest birthdays grouped by section
    Upcoming {
        /// Contacts export (CSV or .vcf)
        #[arg(long)]
        contacts: Option<PathBuf>,

        /// Number of birthdays to show (default: 8)
        #[arg(long, default_value_t = bday_core::GLANCE_LIMIT)]
        limit: usize,
    },

    /// Replace outstanding reminders with a fresh batch
    Schedule {
        #[arg(long)]
        contacts: Option<PathBuf>,

        /// Print the batch without touching the outbox
        #[arg(long)]
        dry_run: bool,
    },

    /// List outstanding reminders in trigger order
    Outbox,

    /// Write the planned batch as an .ics calendar
    ExportIcs {
        #[arg(long)]
        contacts: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved configuration
    ConfigCheck,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            config::init_config()?;
        }

        Command::Upcoming { contacts, limit } => {
            let cfg = config::load_config()?;
            let snapshot = load_snapshot(&cfg, contacts)?;
            let now = cfg.now_local()?;

            let entries = upcoming(&snapshot.people, now, limit);
            if entries.is_empty() {
                println!("No upcoming birthdays.");
                return Ok(());
            }

            for (section, items) in group_by_section(entries) {
                println!("## {}\n", section.label());
                for e in items {
                    let turning = e.turning.map(|age| format!(" (turns {age})")).unwrap_or_default();
                    println!(
                        "- {} | {} | {}{}",
                        e.date.format("%b %-d"),
                        e.days_until_text(),
                        e.name,
                        turning
                    );
                }
                println!();
            }
        }

        Command::Schedule { contacts, dry_run } => {
            let cfg = config::load_config()?;
            let sched_cfg = cfg.scheduler_config()?;
            let snapshot = load_snapshot(&cfg, contacts)?;
            let now = cfg.now_local()?;

            if dry_run {
                let plan = plan_batch(&snapshot, &sched_cfg, now);
                println!("Planned {} reminders (ceiling {})\n", plan.events.len(), sched_cfg.ceiling);
                for e in &plan.events {
                    println!("- {} | {} | {}", e.trigger_at.format("%Y-%m-%d %H:%M"), e.id, e.title);
                }
                print_rejected(&plan.rejected);
                if plan.truncated {
                    println!("\nCeiling reached; later birthdays were not planned.");
                }
                return Ok(());
            }

            let home = state::ensure_bday_home()?;
            let _lock = state::PassLock::acquire(&home)?;

            let outbox = FileOutbox::open(
                state::outbox_path()?,
                cfg.notifications.authorization,
                sched_cfg.ceiling,
            )?;
            let path = outbox.path().to_path_buf();
            let scheduler = BirthdayScheduler::new(outbox, sched_cfg);

            let report = scheduler
                .reschedule(&snapshot, now)
                .await
                .context("scheduling pass failed")?;

            if report.status == PassStatus::NotAuthorized {
                println!(
                    "Notifications are not authorized ({:?}); outbox left unchanged.",
                    report.authorization
                );
                return Ok(());
            }

            println!("Scheduled {} of {} reminders -> {}", report.scheduled, report.batch.len(), path.display());
            for f in &report.failures {
                println!("  failed: {} ({})", f.event_id, f.reason);
            }
            print_rejected(&report.rejected);
            if report.truncated {
                println!("Ceiling reached; later birthdays were not scheduled.");
            }
        }

        Command::Outbox => {
            let events = outbox::read_events(&state::outbox_path()?)?;
            if events.is_empty() {
                println!("Outbox is empty. Run: bday schedule");
                return Ok(());
            }
            for e in &events {
                println!("- {} | {} | {}", e.trigger_at.format("%Y-%m-%d %H:%M"), e.id, e.body);
            }
        }

        Command::ExportIcs { contacts, output } => {
            let cfg = config::load_config()?;
            let sched_cfg = cfg.scheduler_config()?;
            let snapshot = load_snapshot(&cfg, contacts)?;
            let plan = plan_batch(&snapshot, &sched_cfg, cfg.now_local()?);

            let ics = calendar::events_to_ics(&plan.events);
            match output {
                Some(p) => {
                    std::fs::write(&p, ics).with_context(|| format!("write {}", p.display()))?;
                    println!("Wrote {} events to {}", plan.events.len(), p.display());
                }
                None => print!("{ics}"),
            }
        }

        Command::ConfigCheck => {
            let path = config::config_path()?;
            let cfg = config::load_config_from(&path)?;
            let sched_cfg = cfg.scheduler_config()?;

            println!("Config: {}{}", path.display(), if path.exists() { "" } else { " (defaults)" });
            println!("Delivery time: {}", sched_cfg.delivery.time().format("%H:%M"));
            println!("Ceiling: {}", sched_cfg.ceiling);
            println!("Authorization: {:?}", cfg.notifications.authorization);
            println!(
                "Timezone: {}",
                cfg.calendar.timezone.as_deref().unwrap_or("system local")
            );
            println!("Now: {}", cfg.now_local()?.format("%Y-%m-%d %H:%M"));
            println!("Contacts: {}", contacts_path(&cfg, None)?.display());
            for (name, group) in &cfg.groups {
                println!("Group {name}: {}", group.preference.label());
            }
        }
    }

    Ok(())
}

fn contacts_path(cfg: &Config, arg: Option<PathBuf>) -> Result<PathBuf> {
    match arg.or_else(|| cfg.contacts.path.clone()) {
        Some(p) => Ok(p),
        None => state::default_contacts_path(),
    }
}

fn load_snapshot(cfg: &Config, arg: Option<PathBuf>) -> Result<ContactSnapshot> {
    let path = contacts_path(cfg, arg)?;
    if !path.exists() {
        bail!(
            "Contacts not found: {} (pass --contacts <file> or set [contacts] path)",
            path.display()
        );
    }
    let import = bday_ingest::load_contacts(&path)
        .with_context(|| format!("loading contacts from {}", path.display()))?;
    tracing::info!(contacts = import.len(), path = %path.display(), "contacts loaded");
    Ok(import.snapshot(&cfg.group_preferences()))
}

fn print_rejected(rejected: &[bday_core::RejectedRecord]) {
    for r in rejected {
        println!("  rejected: {} ({})", r.person_id, r.reason);
    }
}
