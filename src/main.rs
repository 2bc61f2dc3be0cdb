use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod charts;
mod config;
mod document;
mod html;
mod intake;
mod models;
mod report;
mod server;
mod store;
mod svg;

use config::DataPaths;
use models::{Major, Record, WidgetState, DEFAULT_BINS, DEFAULT_HOURS};

#[derive(Parser)]
#[command(name = "survey-visuals")]
#[command(about = "Survey intake form and data visualizations over a shared CSV", long_about = None)]
struct Cli {
    /// Directory holding the survey CSV and the chart JSON document
    #[arg(long, env = "SURVEY_DATA_DIR", default_value = ".", global = true)]
    data_dir: PathBuf,
    #[arg(long, default_value = config::DEFAULT_CSV, global = true)]
    csv: PathBuf,
    #[arg(long, default_value = config::DEFAULT_JSON, global = true)]
    json: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the survey and visuals pages
    Serve {
        #[arg(long, env = "SURVEY_ADDR", default_value = "127.0.0.1:8501")]
        addr: String,
    },
    /// Append one survey entry to the CSV
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i64,
        #[arg(long)]
        major: Major,
        #[arg(long, default_value_t = DEFAULT_HOURS as i64)]
        hours: i64,
    },
    /// Print the current CSV contents
    Show,
    /// Render the visuals page to a standalone HTML file
    Report {
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
        /// Restrict the scatter plot to these majors (repeatable)
        #[arg(long = "major")]
        majors: Vec<String>,
        #[arg(long, default_value = "report.html")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = DataPaths::new(&cli.data_dir, &cli.csv, &cli.json);

    match cli.command {
        Commands::Serve { addr } => {
            server::serve(&addr, server::AppState::new(paths))
                .await
                .context("survey server stopped")?;
        }
        Commands::Submit {
            name,
            age,
            major,
            hours,
        } => {
            let record = Record::new(name, age, major, hours);
            let outcome = store::append_record(&paths.csv, &record)
                .with_context(|| format!("failed to save to {}", paths.csv.display()))?;
            println!(
                "Data submitted successfully and saved to {}!",
                paths.csv.display()
            );
            print_table(&outcome.table.tail(intake::PREVIEW_ROWS));
        }
        Commands::Show => match store::load(&paths.csv) {
            store::StoreLoad::Loaded { table, .. } => print_table(&table),
            store::StoreLoad::Missing | store::StoreLoad::Empty => {
                println!("No data found yet. Submit a new entry to create {}.", paths.csv_name());
            }
            store::StoreLoad::Unreadable(err) => {
                return Err(err).with_context(|| format!("couldn't read {}", paths.csv.display()));
            }
        },
        Commands::Report { bins, majors, out } => {
            let state = WidgetState::default().with_bins(bins).with_majors(majors);
            let pass = report::render(&paths, state, report::Surface::Snapshot);
            std::fs::write(&out, pass.html)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn print_table(table: &models::Table) {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&table.columns));
    for row in &table.rows {
        println!("{}", line(row));
    }
}
