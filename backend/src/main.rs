//! Survey Merge CLI - score evaluation exports and join them with survey answers
//!
//! # Main Commands
//!
//! ```bash
//! survey-merge serve                              # Start HTTP server (port 3000)
//! survey-merge merge evaluations.csv survey.csv   # Write final_processed_file.csv
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! survey-merge parse input.csv       # Just parse CSV to JSON
//! ```

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use survey_merge::config::OUTPUT_FILE_NAME;
use survey_merge::parser::format_delimiter;
use survey_merge::{merge_files, parse_csv_file_auto, MergeOptions, ServerConfig};

#[derive(Parser)]
#[command(name = "survey-merge")]
#[command(about = "Score evaluation exports and join them with survey answers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge an evaluation export with a survey export
    Merge {
        /// Evaluation export (respondent in Q4, ratings in Q9#1_1..Q9#1_12)
        evaluations: PathBuf,

        /// Survey export (respondent in Q1, answers in Q2..Q7)
        survey: PathBuf,

        /// Output file
        #[arg(short, long, default_value = OUTPUT_FILE_NAME)]
        output: PathBuf,

        /// Leading metadata rows to drop from the evaluation export
        #[arg(long)]
        skip_rows: Option<usize>,

        /// Fail if a respondent name appears twice in either export
        #[arg(long)]
        unique_names: bool,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: SURVEY_MERGE_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            evaluations,
            survey,
            output,
            skip_rows,
            unique_names,
            delimiter,
        } => cmd_merge(&evaluations, &survey, &output, skip_rows, unique_names, delimiter),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_merge(
    evaluations: &Path,
    survey: &Path,
    output: &Path,
    skip_rows: Option<usize>,
    unique_names: bool,
    delimiter: Option<char>,
) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = ServerConfig::from_env()?.merge;
    let options = MergeOptions {
        skip_rows: skip_rows.unwrap_or(defaults.skip_rows),
        unique_names: unique_names || defaults.unique_names,
        delimiter: delimiter.map(delimiter_byte).transpose()?,
    };

    let report = merge_files(evaluations, survey, output, &options)?;

    eprintln!("\n✨ Done! {} merged rows", report.merged_rows);
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let delimiter = delimiter.map(delimiter_byte).transpose()?;
    let result = parse_csv_file_auto(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.table.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.table.len());

    let records: Vec<Value> = result
        .table
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = result
                .table
                .headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.clone(), Value::String(v.clone())))
                .collect();
            Value::Object(obj)
        })
        .collect();

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    survey_merge::server::start_server(config).await
}

fn delimiter_byte(c: char) -> Result<u8, String> {
    u8::try_from(c).map_err(|_| format!("Delimiter must be a single-byte character, got '{}'", c))
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
