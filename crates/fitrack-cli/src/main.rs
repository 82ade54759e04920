use clap::{Parser, Subcommand};
use fitrack_core::Config;
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;

#[derive(Parser)]
#[command(name = "fitrack-cli", version, about = "fitrack workout tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Workout session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Past sessions
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Adherence statistics
    Stats(commands::stats::StatsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr. RUST_LOG wins over the configured filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = Config::path()
            .ok()
            .filter(|p| p.exists())
            .and_then(|p| Config::load_from(&p).ok())
            .map(|c| c.log_filter)
            .unwrap_or_else(|| Config::default().log_filter);
        EnvFilter::try_new(&configured).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
