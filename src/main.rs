//! Benchpivot CLI - reshape benchmark results into analyst tables
//!
//! # Main Commands
//!
//! ```bash
//! benchpivot run                      # Run the pipeline from benchpivot.yaml
//! benchpivot run -c custom.yaml       # Run with a specific config
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! benchpivot parse results.csv        # Just ingest one CSV to JSON
//! benchpivot example-config           # Show an example YAML config
//! ```

use benchpivot::{example_config, parse_file_auto, run, Config};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "benchpivot")]
#[command(about = "Reshape benchmark-result tables into analyst-facing wide tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline described by a YAML config
    Run {
        /// Config file path
        #[arg(short, long, default_value = "benchpivot.yaml")]
        config: PathBuf,
    },

    /// Ingest a single CSV file and output JSON records
    Parse {
        /// Input CSV file (standard or transposed per-run layout)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show an example YAML configuration
    ExampleConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => cmd_run(&config),
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),
        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Loading config: {}", config_path.display());
    let config = Config::load(config_path)?;

    let summary = run(&config)?;

    eprintln!("Processed {} records", summary.record_count);
    for path in &summary.output_files {
        eprintln!("  -> {}", path.display());
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing: {}", input.display());

    let result = parse_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        match result.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("   Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_config().to_yaml()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{content}");
        }
    }
    Ok(())
}
