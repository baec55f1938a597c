#![forbid(unsafe_code)]

mod cmd;
mod output;
mod staff;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use taxq_core::QueueError;
use taxq_core::config::load_user_config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tq: tax-return workqueue for preparation firms",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides --json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Account subdomain or id; falls back to the environment, then config.
    #[arg(long, global = true)]
    account: Option<String>,

    /// Staff member recorded on edits; falls back to the environment.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a taxq project",
        long_about = "Create .taxq/ with a config template and the workqueue store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    tq init\n\n    # Rewrite the config template\n    tq init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Manage accounts",
        after_help = "EXAMPLES:\n    # Create an account\n    tq account add acme --name \"Acme Tax\"\n\n    # List accounts\n    tq account list --json"
    )]
    Account(cmd::account::AccountArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show or extend the status and extension catalogs",
        after_help = "EXAMPLES:\n    tq lookups list\n    tq lookups add-extension \"November 15\""
    )]
    Lookups(cmd::lookups::LookupsArgs),

    #[command(
        next_help_heading = "Queue",
        about = "Add a return to the queue",
        long_about = "Create a work item. It joins the tail of the queue unless --at names a rank.",
        after_help = "EXAMPLES:\n    # Add a return received today\n    tq add -i AB12 -y 2024\n\n    # Add an extended return\n    tq add -i CD34 -y 2024 --status extended --extension \"October 15\"\n\n    # Put a return at the front of the queue\n    tq add -i EF56 -y 2024 --at 1"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Queue",
        about = "Edit a work item",
        long_about = "Change fields of a work item. A status change re-ranks the queue.",
        after_help = "EXAMPLES:\n    # Start preparing a return\n    tq edit 7 --status \"In Progress\"\n\n    # Mark a return completed\n    tq edit 7 --status completed"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Queue",
        about = "Move a work item to a new rank",
        after_help = "EXAMPLES:\n    # Move item 7 to the front\n    tq move 7 --to 1"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Queue",
        about = "Apply a full queue order",
        long_about = "Rank every queued item in the given order. Completed items are ignored.",
        after_help = "EXAMPLES:\n    tq reorder 9 7 8"
    )]
    Reorder(cmd::reorder::ReorderArgs),

    #[command(
        next_help_heading = "Queue",
        about = "Delete a work item",
        after_help = "EXAMPLES:\n    tq delete 7"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Read",
        about = "List the queue in rank order",
        after_help = "EXAMPLES:\n    # Active returns\n    tq list\n\n    # Everything for 2024, including completed\n    tq list --year 2024 --all\n\n    # Emit machine-readable output\n    tq list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one work item",
        after_help = "EXAMPLES:\n    tq show 7"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        name = "check-id",
        next_help_heading = "Read",
        about = "Check whether an identifier is free for a return year",
        after_help = "EXAMPLES:\n    tq check-id AB12 --year 2024\n\n    # While editing item 7\n    tq check-id AB12 --year 2024 --exclude 7"
    )]
    CheckId(cmd::check_id::CheckIdArgs),

    #[command(
        next_help_heading = "Read",
        about = "Queue statistics",
        after_help = "EXAMPLES:\n    tq stats\n    tq stats --year 2024 --json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Client",
        about = "Look up a return the way its client sees it",
        after_help = "EXAMPLES:\n    tq lookup --subdomain acme --year 2024 --identifier AB12"
    )]
    Lookup(cmd::lookup::LookupArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Repair queue ranks",
        long_about = "Re-rank every item of the account in its stored order. --check only verifies.",
        after_help = "EXAMPLES:\n    tq recompute\n    tq recompute --check"
    )]
    Recompute(cmd::recompute::RecomputeArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    tq completions bash > ~/.local/share/bash-completion/completions/tq"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TAXQ_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "taxq=debug,info"
        } else {
            "taxq=info,warn"
        })
    });

    let format = env::var("TAXQ_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Map a command failure to what the user sees.
fn to_cli_error(err: &anyhow::Error) -> CliError {
    if let Some(queue) = err.downcast_ref::<QueueError>() {
        return CliError::from(queue);
    }
    if let Some(coded) = err.downcast_ref::<cmd::CodedError>() {
        return CliError::with_code(coded.message.clone(), coded.code);
    }
    CliError::new(format!("{err:#}"))
}

fn run(command: &Commands, globals: &cmd::Globals) -> anyhow::Result<()> {
    let output = globals.output;
    let root = &globals.project_root;
    match command {
        Commands::Init(args) => cmd::init::run_init(args, output, root),
        Commands::Account(args) => cmd::account::run_account(args, globals),
        Commands::Lookups(args) => cmd::lookups::run_lookups(args, output, root),
        Commands::Add(args) => cmd::add::run_add(args, globals),
        Commands::Edit(args) => cmd::edit::run_edit(args, globals),
        Commands::Move(args) => cmd::move_cmd::run_move(args, globals),
        Commands::Reorder(args) => cmd::reorder::run_reorder(args, globals),
        Commands::Delete(args) => cmd::delete::run_delete(args, globals),
        Commands::List(args) => cmd::list::run_list(args, globals),
        Commands::Show(args) => cmd::show::run_show(args, globals),
        Commands::CheckId(args) => cmd::check_id::run_check_id(args, globals),
        Commands::Stats(args) => cmd::stats::run_stats(args, globals),
        Commands::Lookup(args) => cmd::lookup::run_lookup(args, output, root),
        Commands::Recompute(args) => cmd::recompute::run_recompute(args, globals),
        Commands::Completions(args) => {
            cmd::completions::run_completions(args.shell, &mut Cli::command())
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let user_config = load_user_config().unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable user config");
        taxq_core::config::UserConfig::default()
    });
    let output = output::resolve_output_mode(cli.format, cli.json, user_config.output.as_deref());

    let project_root = match env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            let _ = output::render_error(output, &CliError::new(format!("current directory: {err}")));
            return std::process::ExitCode::FAILURE;
        }
    };

    let globals = cmd::Globals {
        project_root,
        output,
        account: cli.account,
        user: staff::resolve_staff(cli.user.as_deref(), user_config.staff.as_deref()),
        quiet: cli.quiet,
    };
    tracing::debug!(user = ?globals.user, ?output, "resolved invocation");

    match run(&cli.command, &globals) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            let cli_error = to_cli_error(&err);
            if err.downcast_ref::<QueueError>().is_some_and(QueueError::is_integrity) {
                tracing::error!(error = %err, "workqueue integrity failure");
            }
            if output::render_error(output, &cli_error).is_err() {
                eprintln!("error: {}", cli_error.message);
            }
            std::process::ExitCode::FAILURE
        }
    }
}
