//! Command-line interface for the winsorization tool.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::ArtifactLayout;
use crate::core::loaders::Table;
use crate::processors::{FileSlot, Session, StatisticsTable};
use crate::WinsorConfig;

#[derive(Parser)]
#[command(name = "winsor-tool")]
#[command(about = "Winsorize CSV columns and compare distributions before and after", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the column names of a CSV file
    ListColumns {
        /// Input CSV file
        file: PathBuf,
    },

    /// Winsorize columns, write the processed dataset and a comparison plot
    Process {
        /// Input CSV file
        file: PathBuf,
        /// Columns to winsorize (comma-separated)
        #[arg(long)]
        columns: String,
        /// Winsorization level in percent, applied to both tails
        #[arg(short, long)]
        level: Option<f64>,
        /// Base directory for output artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Write artifacts directly into the output directory, shared by all runs
        #[arg(long)]
        shared: bool,
        /// Also copy the artifacts to <output-dir>/latest
        #[arg(long)]
        latest: bool,
        /// Render the plot without captions and axis labels
        #[arg(long)]
        no_annotate: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 37 {
            format!("{}...", value.chars().take(34).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<37} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Render rows under headers as an aligned text grid.
fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(headers.iter().copied(), &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn table_grid(table: &Table) -> String {
    let rows: Vec<Vec<String>> = (0..table.num_rows())
        .filter_map(|i| table.row(i))
        .map(|row| row.into_iter().map(str::to_string).collect())
        .collect();
    render_grid(&table.column_names(), &rows)
}

fn statistics_grid(statistics: &StatisticsTable) -> String {
    let rows: Vec<Vec<String>> = statistics.rows().into_iter().map(Vec::from).collect();
    render_grid(&StatisticsTable::HEADERS, &rows)
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match WinsorConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {:#}, using defaults", path.display(), e);
                WinsorConfig::default()
            }
        },
        None => WinsorConfig::default(),
    };

    match cli.command {
        Commands::ListColumns { file } => {
            cmd_list_columns(&file, config);
        }
        Commands::Process { file, columns, level, output_dir, shared, latest, no_annotate } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if shared {
                config.output.layout = ArtifactLayout::Shared;
            }
            if latest {
                config.output.latest_alias = true;
            }
            if no_annotate {
                config.plot.annotate = false;
            }
            cmd_process(&file, &columns, level, config);
        }
    }
}

fn cmd_list_columns(file: &PathBuf, config: WinsorConfig) {
    let session = Session::new(config);
    println!("{}", session.list_columns(file));
}

fn cmd_process(file: &PathBuf, columns: &str, level: Option<f64>, config: WinsorConfig) {
    let start = Instant::now();

    let session = Session::new(config);
    let level = level.unwrap_or(session.config().defaults.level);

    println!("Winsorizing {} at {}%...", file.display(), level);

    let spinner = create_spinner("Processing data...");
    let response = session.process(file, columns, level);
    spinner.finish_and_clear();

    let dataset = match &response.file {
        FileSlot::Artifact(path) => path,
        FileSlot::Error(message) => {
            error!("Processing failed");
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    if let Some(preview) = &response.preview {
        println!("Preview of processed data:");
        println!("{}", table_grid(preview));
        println!();
    }

    if let Some(statistics) = response.statistics.as_ref().filter(|s| !s.is_empty()) {
        println!("Statistics before and after winsorization:");
        println!("{}", statistics_grid(statistics));
    }

    let plot = response
        .plot
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    print_summary(
        "Winsorization Complete",
        &[
            ("Input file", file.display().to_string()),
            ("Columns", columns.to_string()),
            ("Level (%)", level.to_string()),
            ("Dataset", dataset.display().to_string()),
            ("Plot", plot),
            (
                "Session",
                session.artifacts().namespace().unwrap_or("shared").to_string(),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}
