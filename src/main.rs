use afcon_etl::config::Config;
use afcon_etl::constants::DEFAULT_CONFIG_PATH;
use afcon_etl::pipeline::{Pipeline, PipelineResult};
use afcon_etl::storage::{self, MatchStore};
use afcon_etl::types::{MatchRecord, RawMatch, Stage};
use afcon_etl::{extract, logging, transform};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "afcon_etl")]
#[command(about = "Load AFCON 2025 match fixtures from CSV into a relational table")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract, transform and load
    Run {
        /// Override the input CSV path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Create the matches table before loading
        #[arg(long)]
        migrate: bool,
    },
    /// Preview the raw CSV: head, shape and columns
    Extract {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Number of rows to show
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Dry run: print the cleaned rows without loading them
    Transform {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the matches table
    Migrate,
    /// Print the rows currently in the store
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = logging::init_logging(&config.logging);

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Run { csv, migrate } => {
            if let Some(csv) = csv {
                config.source.csv_path = csv;
            }
            config.load.migrate |= migrate;

            let store = storage::open_store(&config.database)?;
            let result = Pipeline::new(&config, store.as_ref()).run().await?;
            print_summary(&result);
        }
        Commands::Extract { csv, rows } => {
            if let Some(csv) = csv {
                config.source.csv_path = csv;
            }
            let raw = extract::extract_matches(&config.source.csv_path)
                .map_err(|e| e.in_stage(Stage::Extract))?;

            println!("==================Head==================");
            for row in raw.head(rows) {
                println!("{}", format_raw(row));
            }
            let (n_rows, n_cols) = raw.shape();
            println!("==================Shape=================");
            println!("({n_rows}, {n_cols})");
            println!("==================Columns===============");
            println!("{:?}", raw.columns());
        }
        Commands::Transform { csv, json } => {
            if let Some(csv) = csv {
                config.source.csv_path = csv;
            }
            let raw = extract::extract_matches(&config.source.csv_path)
                .map_err(|e| e.in_stage(Stage::Extract))?;
            let clean = transform::transform_matches(raw);

            if json {
                println!("{}", serde_json::to_string_pretty(&clean.rows)?);
            } else {
                for row in &clean.rows {
                    println!("{}", format_record(row));
                }
                println!(
                    "\n🔧 {} raw rows → {} clean rows ({} duplicates removed, {} unparsed dates)",
                    clean.stats.raw_rows,
                    clean.len(),
                    clean.stats.duplicates_removed,
                    clean.stats.unparsed_dates
                );
                if !clean.stats.conflicting_keys.is_empty() {
                    println!(
                        "⚠️  Match numbers on differing rows: {:?}",
                        clean.stats.conflicting_keys
                    );
                }
            }
        }
        Commands::Migrate => {
            let store = storage::open_store(&config.database)?;
            store.migrate().await?;
            println!("✅ matches table ready ({})", store.backend_name());
        }
        Commands::Show => {
            let store = storage::open_store(&config.database)?;
            show(store.as_ref()).await?;
        }
    }
    Ok(())
}

async fn show(store: &dyn MatchStore) -> Result<()> {
    let rows = store.fetch_matches().await?;
    for row in &rows {
        println!("{}", format_record(row));
    }
    println!("\n{} rows in {}", rows.len(), store.backend_name());
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Pipeline Results for {}:", result.source);
    println!("   Raw rows: {}", result.raw_rows);
    println!("   Clean rows: {}", result.clean_rows);
    println!("   Duplicates removed: {}", result.transform.duplicates_removed);
    println!("   Unparsed dates: {}", result.transform.unparsed_dates);
    match (&result.load, &result.load_error) {
        (Some(load), _) => println!(
            "   Loaded: {} rows into {} in {:.2}s",
            load.rows_written, load.backend, load.elapsed_secs
        ),
        (None, Some(err)) => println!("   ⚠️  Load skipped after error: {err}"),
        (None, None) => {}
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn format_raw(row: &RawMatch) -> String {
    format!(
        "{:>3} | R{} | {:<16} | {:<30} | {} v {} | {} | {}",
        row.match_number,
        row.round_number.map(|r| r.to_string()).unwrap_or_default(),
        text(&row.date),
        text(&row.location),
        text(&row.home_team),
        text(&row.away_team),
        text(&row.group),
        text(&row.result),
    )
}

fn format_record(row: &MatchRecord) -> String {
    let date = match (row.match_year, row.match_month, row.match_day) {
        (Some(y), Some(m), Some(d)) => format!("{y:04}-{m:02}-{d:02}"),
        _ => "----------".to_string(),
    };
    let time = row
        .match_time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    format!(
        "{:>3} | R{} | {} {} | {:<30} | {} v {} | {} | {}",
        row.match_number,
        row.round_number.map(|r| r.to_string()).unwrap_or_default(),
        date,
        time,
        text(&row.location),
        text(&row.home_team),
        text(&row.away_team),
        text(&row.group_name),
        text(&row.result),
    )
}
