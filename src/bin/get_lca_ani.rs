//! CLI binary: per-rank ANI summary from the SQLite comparisons store

use clap::Parser;
use lca_ani_rs::{
    db::ComparisonDb,
    stats::{format_cell, AniSummary},
    taxonomy::Rank,
    utils::{create_writer, init_logging, prepare_output, validate_file_readable},
    LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "get_lca_ani")]
#[command(about = "Summarize ANI per LCA rank from a comparisons database")]
#[command(long_about = "
Reads the `comparisons` table written by prefetch_to_lca_sql and reports the
minimum, mean and maximum ANI of the comparisons whose lowest common
ancestor falls at each rank, superkingdom through species:

    rank,minANI,avgANI,maxANI

Ranks without comparisons get empty cells. Each --lca-name adds a row with
the same statistics for comparisons whose LCA is that taxon.
")]
struct Args {
    /// ANI SQLite database
    #[arg(value_name = "ANIDB")]
    anidb: PathBuf,

    /// Path to the output CSV file
    #[arg(short, long, value_name = "FILE")]
    output_csv: PathBuf,

    /// Also summarize comparisons whose LCA is this taxon (repeatable)
    #[arg(long, value_name = "NAME")]
    lca_name: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

fn summary_cells(summary: Option<AniSummary>) -> [String; 3] {
    match summary {
        Some(s) => [
            format_cell(Some(s.min)),
            format_cell(Some(s.avg)),
            format_cell(Some(s.max)),
        ],
        None => [String::new(), String::new(), String::new()],
    }
}

/// One line of the stderr report: `label: min | avg | max`
fn report_line(label: &str, cells: &[String; 3]) -> String {
    format!("{}: {} | {} | {}", label, cells[0], cells[1], cells[2])
}

fn run() -> LcaAniResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    validate_file_readable(&args.anidb)?;
    prepare_output(&args.output_csv, args.force)?;

    let db = ComparisonDb::open(&args.anidb)?;
    log::info!("{} comparisons in {:?}", db.count()?, args.anidb);

    let mut writer = csv::Writer::from_writer(create_writer(&args.output_csv)?);
    writer.write_record(["rank", "minANI", "avgANI", "maxANI"])?;

    eprintln!("rank:    minANI | avgANI | maxANI");
    eprintln!("---------------------------------");
    for rank in Rank::ALL {
        let cells = summary_cells(db.rank_ani_stats(rank)?);
        eprintln!("{}", report_line(rank.as_str(), &cells));
        let [min, avg, max] = cells;
        writer.write_record([rank.as_str(), min.as_str(), avg.as_str(), max.as_str()])?;
    }

    for name in &args.lca_name {
        let summary = db.lca_name_ani_stats(name)?;
        if summary.is_none() {
            log::warn!("No comparisons with LCA {}", name);
        }
        let cells = summary_cells(summary);
        eprintln!("{}", report_line(name, &cells));
        let [min, avg, max] = cells;
        writer.write_record([name.as_str(), min.as_str(), avg.as_str(), max.as_str()])?;
    }

    writer.flush()?;
    log::info!("Results written to: {:?}", args.output_csv);
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: LcaAniError) -> ! {
    match error {
        LcaAniError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the database exists and is readable.");
        }
        LcaAniError::InvalidRecord(msg) => {
            eprintln!("Error: Invalid record: {}", msg);
        }
        LcaAniError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
        }
        LcaAniError::Taxonomy(msg) => {
            eprintln!("Error: Taxonomy error: {}", msg);
        }
        LcaAniError::Csv(ref e) => {
            eprintln!("Error: CSV processing error: {}", e);
        }
        LcaAniError::Sqlite(ref e) => {
            eprintln!("Error: SQLite error: {}", e);
            eprintln!("Please check that the database was written by prefetch_to_lca_sql.");
        }
        LcaAniError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
