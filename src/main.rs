use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use gaia_pipeline::db::repos::{activity, clients, history, settings};
use gaia_pipeline::db::settings_keys::CURRENT_USER;
use gaia_pipeline::engine::session::resolve_actor;
use gaia_pipeline::engine::{phases, priority, summary};
use gaia_pipeline::notifications::ConsoleNotifier;
use gaia_pipeline::{
    logging, snapshot, validation, AppConfig, AppError, AppState, CreateClientInput, Phase,
    Transition, UpdateClientInput,
};

#[derive(Parser)]
#[command(name = "gaia-pipeline", version, about = "Track clients through the booked/preparing/testing/running pipeline")]
struct Cli {
    /// Data directory holding gaia.db and logs (or set GAIA_DATA_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Name recorded on history and activity entries (or set GAIA_ACTOR)
    #[arg(long, global = true)]
    actor: Option<String>,
    /// Skip the auto-switch sweep that normally runs before every command
    #[arg(long, global = true)]
    no_sweep: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a client (defaults to the preparing phase)
    Add {
        name: String,
        #[arg(long, value_parser = parse_phase)]
        phase: Option<Phase>,
        #[command(flatten)]
        fields: ClientFields,
    },
    /// List clients, optionally one phase only
    List {
        #[arg(long, value_parser = parse_phase)]
        phase: Option<Phase>,
    },
    /// Show one client with its phase history
    Show { id: String },
    /// Edit descriptive fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ClientFields,
    },
    /// Advance to the next phase
    Next { id: String },
    /// Jump to any phase
    Move { id: String, phase: String },
    /// Board drop into a phase (counts resubscriptions into preparing)
    Drop {
        id: String,
        #[arg(value_parser = parse_phase)]
        phase: Phase,
    },
    /// Start a new testing round
    Round { id: String },
    /// Add to the current testing round's usage
    Usage { id: String, amount: i64 },
    /// Set the manual order of a phase; list every client id in it
    Reorder {
        #[arg(value_parser = parse_phase)]
        phase: Phase,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove a client (history is kept)
    Archive { id: String },
    /// Run the auto-switch sweep
    Sweep {
        /// Sweep as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Phase history, newest first
    History {
        #[arg(long)]
        client: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Recent activity, newest first
    Activity {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// All four columns with their clients
    Board,
    /// Per-phase counts and auto-switch status
    Stats,
    /// Write every client to a JSON snapshot
    Export { path: PathBuf },
    /// Load clients from a JSON snapshot
    Import { path: PathBuf },
    /// Show or set the current user
    Whoami {
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,
        /// Forget the stored user
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct ClientFields {
    #[arg(long)]
    auto_switch: Option<bool>,
    #[arg(long)]
    auto_switch_days: Option<i64>,
    /// YYYY-MM-DD
    #[arg(long)]
    next_phase_date: Option<String>,
    #[arg(long)]
    package: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    payment_status: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    contact_phone: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

fn parse_phase(raw: &str) -> Result<Phase, String> {
    Phase::parse(raw).ok_or_else(|| {
        format!("unknown phase '{raw}' (expected booked, preparing, testing or running)")
    })
}

fn emit<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(err: &AppError) -> ExitCode {
    tracing::error!(kind = err.kind(), error = %err, "Command failed");
    match serde_json::to_string(err) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{err}"),
    }
    ExitCode::FAILURE
}

fn run(cli: Cli, config: &AppConfig) -> Result<(), AppError> {
    let state = AppState::open(config, Arc::new(ConsoleNotifier))?;
    let explicit_sweep = matches!(cli.command, Command::Sweep { .. });
    if !cli.no_sweep && !explicit_sweep {
        state.startup_sweep();
    }
    let session = &state.session;
    let pool = &state.db;

    match cli.command {
        Command::Add { name, phase, fields } => {
            let input = CreateClientInput {
                name,
                phase,
                auto_switch: fields.auto_switch,
                auto_switch_days: fields.auto_switch_days,
                next_phase_date: fields.next_phase_date,
                package_name: fields.package,
                package_price: fields.price,
                payment_status: fields.payment_status,
                contact_name: fields.contact_name,
                contact_email: fields.contact_email,
                contact_phone: fields.contact_phone,
                notes: fields.notes,
            };
            emit(&phases::create_client(session, input)?)
        }
        Command::List { phase } => {
            let list = match phase {
                Some(p) => clients::get_by_phase(pool, p)?,
                None => clients::get_all(pool)?,
            };
            emit(&list)
        }
        Command::Show { id } => {
            let client = clients::get_by_id(pool, &id)?;
            let entries = history::list_for(pool, &id)?;
            emit(&serde_json::json!({ "client": client, "history": entries }))
        }
        Command::Update { id, name, fields } => {
            let input = UpdateClientInput {
                name,
                auto_switch: fields.auto_switch,
                auto_switch_days: fields.auto_switch_days,
                next_phase_date: fields.next_phase_date,
                package_name: fields.package,
                package_price: fields.price,
                payment_status: fields.payment_status,
                contact_name: fields.contact_name,
                contact_email: fields.contact_email,
                contact_phone: fields.contact_phone,
                notes: fields.notes,
            };
            if input.is_empty() {
                return Err(AppError::Validation("Nothing to update".into()));
            }
            emit(&phases::update_client(session, &id, input)?)
        }
        Command::Next { id } => emit(&phases::move_to_next_phase(session, &id)?),
        Command::Move { id, phase } => emit(&phases::move_to_phase_named(session, &id, &phase)?),
        Command::Drop { id, phase } => emit(&phases::drop_into_phase(session, &id, phase)?),
        Command::Round { id } => emit(&phases::start_new_testing_round(session, &id)?),
        Command::Usage { id, amount } => emit(&phases::record_usage(session, &id, amount)?),
        Command::Reorder { phase, ids } => emit(&priority::reorder_phase(session, phase, &ids)?),
        Command::Archive { id } => {
            let outcome: Transition = phases::archive_client(session, &id)?;
            emit(&outcome)
        }
        Command::Sweep { as_of } => {
            let report = match as_of {
                Some(raw) => {
                    let day = validation::parse_date("as_of", &raw)?;
                    phases::process_auto_switches_as_of(session, day)?
                }
                None => phases::process_auto_switches(session)?,
            };
            emit(&report)
        }
        Command::History { client, limit } => {
            let entries = match client {
                Some(id) => history::list_for(pool, &id)?,
                None => history::get_recent(pool, limit)?,
            };
            emit(&entries)
        }
        Command::Activity { limit } => emit(&activity::get_recent(pool, limit)?),
        Command::Board => emit(&summary::board(pool)?),
        Command::Stats => {
            let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
            emit(&summary::stats(pool, &today)?)
        }
        Command::Export { path } => {
            let count = snapshot::export(pool, &path)?;
            emit(&serde_json::json!({ "path": path, "exported": count }))
        }
        Command::Import { path } => emit(&snapshot::import(session, &path)?),
        Command::Whoami { set, clear } => {
            let actor = match set {
                Some(name) => {
                    validation::require_non_empty("name", &name)?;
                    settings::set(pool, CURRENT_USER, name.trim())?;
                    name.trim().to_string()
                }
                None if clear => {
                    settings::delete(pool, CURRENT_USER)?;
                    resolve_actor(pool, config.actor.as_deref())?
                }
                None => session.actor.clone(),
            };
            emit(&serde_json::json!({ "actor": actor }))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(actor) = cli.actor.clone() {
        config.actor = Some(actor);
    }

    let _log_guard = logging::init(&config);
    logging::install_crash_hook(&config.data_dir);
    tracing::info!("Starting gaia-pipeline v{}", env!("CARGO_PKG_VERSION"));

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}
