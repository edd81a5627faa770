use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use ledgerd::services::{HttpSnapshotSource, SmtpMailer};
use ledgerd::{Checker, Config, Result, StateStore};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledgerd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ledger change monitor", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config.toml (default: ./config.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single check of the ledger
    Check,

    /// Run checks on a fixed interval
    Watch {
        /// Override the configured interval in minutes
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show the persisted run state
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ledgerd=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "ledgerd", &mut io::stdout());
        return Ok(());
    }

    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Check => {
            println!("{}", "Checking the ledger...".cyan());
            let source = HttpSnapshotSource::new(&config)?;
            let mailer = SmtpMailer::new(&config.email)?;
            let checker = Checker::new(&config, &source, &mailer);
            checker.run()?;
            println!("{}", "Check complete.".green());
        }

        Commands::Watch { interval } => {
            let minutes = interval.unwrap_or(config.checker.interval_minutes).max(1);
            println!(
                "{}",
                format!("Checking the ledger every {} minutes...", minutes).cyan()
            );
            let source = HttpSnapshotSource::new(&config)?;
            let mailer = SmtpMailer::new(&config.email)?;
            let checker = Checker::new(&config, &source, &mailer);
            loop {
                // Check failures were already routed to the escalation
                // policy; an error here is state bookkeeping trouble.
                if let Err(e) = checker.run() {
                    tracing::error!("check bookkeeping failed: {:#}", e);
                }
                std::thread::sleep(std::time::Duration::from_secs(minutes * 60));
            }
        }

        Commands::Status { json } => {
            print_status(&config, json)?;
        }

        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("ledgerd/config.toml"))
        .unwrap_or(local)
}

fn print_status(config: &Config, json: bool) -> Result<()> {
    let store = StateStore::new(&config.checker.state_path);
    let state = store.load();

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    match &state.last_success {
        Some(at) => println!(
            "Last successful check: {}",
            at.format("%A %d %B %Y at %H:%M:%S").to_string().green()
        ),
        None => println!("Last successful check: {}", "never".yellow()),
    }

    match &state.baseline {
        Some(baseline) => {
            println!("Baseline: {}", baseline.artifacts.filename);
            println!(
                "  Total in {} | total out {} | brought forward {}",
                baseline.key.total_in, baseline.key.total_out, baseline.key.balance_brought_forward
            );
        }
        None => println!("Baseline: {}", "none yet".yellow()),
    }

    let failures = state.consecutive_failures();
    if failures == 0 {
        println!("Consecutive failures: {}", "0".green());
    } else {
        println!(
            "Consecutive failures: {}",
            failures.to_string().red().bold()
        );
        if let Some(last) = state.failure_log.last() {
            println!(
                "  Most recent: {}",
                last.cause.lines().next().unwrap_or("(empty)")
            );
        }
    }

    Ok(())
}
