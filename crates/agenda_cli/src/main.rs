//! `agenda` CLI: store-backed calendar events with overlap merging.
//!
//! ## Usage
//!
//! ```sh
//! # Register a user (prints the new user id)
//! agenda --db agenda.db add-user alice
//!
//! # Schedule events for that user
//! agenda --db agenda.db add-event --title "Meeting 1" \
//!     --start-ms 1700000000000 --end-ms 1700003600000 --invitee <user-id>
//!
//! # Collapse the user's overlapping events into consolidated records
//! agenda --db agenda.db merge <user-id>
//! ```

use agenda_core::db::open_db;
use agenda_core::{
    core_version, default_log_level, init_logging, EventListQuery, EventService,
    ScheduleEventRequest, SqliteEventRepository, SqliteUserRepository, UserService,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "agenda",
    version,
    about = "Store-backed calendar events with overlap merging"
)]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "agenda.db")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user and print its id
    AddUser { name: String },
    /// List registered users
    Users,
    /// Schedule an event and print its id
    AddEvent {
        #[arg(long)]
        title: String,
        /// Start instant in Unix epoch milliseconds
        #[arg(long)]
        start_ms: i64,
        /// End instant in Unix epoch milliseconds
        #[arg(long)]
        end_ms: i64,
        #[arg(long)]
        description: Option<String>,
        /// Invited user id; repeat the flag for multiple invitees
        #[arg(long = "invitee", required = true)]
        invitees: Vec<Uuid>,
    },
    /// List events, optionally scoped to one user's invitations
    Events {
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Soft-delete an event
    RemoveEvent { id: Uuid },
    /// Collapse a user's overlapping events into consolidated records
    Merge { user: Uuid },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(default_log_level(), log_dir).map_err(|message| anyhow!(message))?;
    }
    info!(
        "event=cli_start module=cli status=ok core_version={}",
        core_version()
    );

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database at `{}`", cli.db.display()))?;

    match cli.command {
        Commands::AddUser { name } => {
            let repo = SqliteUserRepository::try_new(&conn)?;
            let user = UserService::new(repo).register_user(name)?;
            println!("{}", user.uuid);
        }
        Commands::Users => {
            let repo = SqliteUserRepository::try_new(&conn)?;
            for user in UserService::new(repo).list_users()? {
                println!("{}\t{}", user.uuid, user.name);
            }
        }
        Commands::AddEvent {
            title,
            start_ms,
            end_ms,
            description,
            invitees,
        } => {
            let repo = SqliteEventRepository::try_new(&mut conn)?;
            let mut service = EventService::new(repo);
            let event = service
                .schedule_event(&ScheduleEventRequest {
                    title,
                    description,
                    start_ms,
                    end_ms,
                    invitees,
                })
                .context("failed to schedule event")?;
            println!("{}", event.uuid);
        }
        Commands::Events {
            user,
            include_deleted,
        } => {
            let repo = SqliteEventRepository::try_new(&mut conn)?;
            let service = EventService::new(repo);
            let events = match user {
                Some(user_id) => service.events_for_user(user_id)?,
                None => service.list_events(&EventListQuery {
                    include_deleted,
                    ..EventListQuery::default()
                })?,
            };
            for event in events {
                print_event(&event);
            }
        }
        Commands::RemoveEvent { id } => {
            let repo = SqliteEventRepository::try_new(&mut conn)?;
            EventService::new(repo)
                .remove_event(id)
                .with_context(|| format!("failed to remove event `{id}`"))?;
            println!("removed {id}");
        }
        Commands::Merge { user } => {
            let repo = SqliteEventRepository::try_new(&mut conn)?;
            let merged = EventService::new(repo).merge_overlapping_events(user)?;
            for event in merged {
                print_event(&event);
            }
        }
    }

    Ok(())
}

fn print_event(event: &agenda_core::Event) {
    println!(
        "{}\t{}..{}\t{}\t{}",
        event.uuid,
        event.start_ms,
        event.end_ms,
        event.status.as_str(),
        event.title
    );
}
