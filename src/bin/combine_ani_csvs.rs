//! CLI binary: join a reference ANI table with a sourmash ANI table

use clap::Parser;
use lca_ani_rs::{
    combine::{combine_ref_fmh, REF_FMH_COLUMNS},
    comparison::ComparisonWriter,
    utils::{init_logging, prepare_output, validate_file_readable, Timer},
    LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "combine_ani_csvs")]
#[command(about = "Join reference ANI and sourmash ANI comparison tables")]
#[command(long_about = "
Joins the output of linref_to_lca_csv (reference ANI, column `ani`) with the
output of prefetch_to_ani_csv (sourmash ANI, column `avg_ani`) on the
comparison name. A sourmash row matches either the same comparison name or
the reversed pair.

Only reference comparisons with a sourmash partner are written, in the
order of the reference table, with the columns ref_ani and fmh_ani.
")]
struct Args {
    /// LCA CSV of reference ANI comparisons
    #[arg(long, value_name = "FILE")]
    ref_ani_csv: PathBuf,

    /// LCA CSV of sourmash comparisons
    #[arg(long, value_name = "FILE")]
    sourmash_ani_csv: PathBuf,

    /// Path to the output CSV file
    #[arg(short, long, value_name = "FILE")]
    output_csv: PathBuf,

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

fn run() -> LcaAniResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    log::info!("Starting reference/sourmash ANI join");
    log::info!("Reference ANI: {:?}", args.ref_ani_csv);
    log::info!("Sourmash ANI: {:?}", args.sourmash_ani_csv);

    validate_file_readable(&args.ref_ani_csv)?;
    validate_file_readable(&args.sourmash_ani_csv)?;
    prepare_output(&args.output_csv, args.force)?;

    let _timer = Timer::new("Joining comparison tables");
    let mut writer = ComparisonWriter::create(&args.output_csv, &REF_FMH_COLUMNS)?;
    let summary = combine_ref_fmh(&args.ref_ani_csv, &args.sourmash_ani_csv, &mut writer)?;
    summary.log_summary();

    log::info!("Results written to: {:?}", args.output_csv);
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: LcaAniError) -> ! {
    match error {
        LcaAniError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        LcaAniError::InvalidRecord(msg) => {
            eprintln!("Error: Invalid record: {}", msg);
            eprintln!("The reference table needs an `ani` column and the sourmash table an `avg_ani` column.");
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
