use chrono::NaiveDate;
use clap::Args;
use fitrack_core::{Clock, Config, Database, SessionHistory, SystemClock};
use std::path::PathBuf;

#[derive(Args)]
pub struct StatsArgs {
    /// Read history from a JSON file instead of the local cache
    #[arg(long)]
    file: Option<PathBuf>,
    /// Compute as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    today: Option<NaiveDate>,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let analyzer = config.analyzer();

    let history = match args.file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)?;
            SessionHistory::from_json(&value)
        }
        None => Database::open()?.load_history()?,
    };

    let today = args
        .today
        .unwrap_or_else(|| analyzer.local_date(SystemClock.now()));
    let stats = analyzer.compute(Some(&history), today);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
