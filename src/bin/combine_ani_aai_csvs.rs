//! CLI binary: join nucleotide (ANI) and protein (AAI) sourmash tables

use clap::Parser;
use lca_ani_rs::{
    combine::{combine_ani_aai, ANI_AAI_COLUMNS},
    comparison::ComparisonWriter,
    utils::{init_logging, prepare_output, validate_file_readable, Timer},
    LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "combine_ani_aai_csvs")]
#[command(about = "Join nucleotide ANI and protein AAI comparison tables")]
#[command(long_about = "
Joins two outputs of prefetch_to_ani_csv, one computed from nucleotide
sketches and one from protein sketches, on the comparison name (or the
reversed pair). The `avg_ani` of each becomes fmh_ani and fmh_aai.

fmh_dnds is the ratio of protein to nucleotide divergence,
(1 - fmh_aai) / (1 - fmh_ani); it is left empty when fmh_ani is 1.
")]
struct Args {
    /// LCA CSV of nucleotide sourmash comparisons
    #[arg(long, value_name = "FILE")]
    sourmash_ani_csv: PathBuf,

    /// LCA CSV of protein sourmash comparisons
    #[arg(long, value_name = "FILE")]
    sourmash_aai_csv: PathBuf,

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

    log::info!("Starting ANI/AAI join");
    log::info!("Nucleotide comparisons: {:?}", args.sourmash_ani_csv);
    log::info!("Protein comparisons: {:?}", args.sourmash_aai_csv);

    validate_file_readable(&args.sourmash_ani_csv)?;
    validate_file_readable(&args.sourmash_aai_csv)?;
    prepare_output(&args.output_csv, args.force)?;

    let _timer = Timer::new("Joining comparison tables");
    let mut writer = ComparisonWriter::create(&args.output_csv, &ANI_AAI_COLUMNS)?;
    let summary = combine_ani_aai(&args.sourmash_ani_csv, &args.sourmash_aai_csv, &mut writer)?;
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
            eprintln!("Both tables need comparison, query_name, match_name and avg_ani columns.");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_combined_workflow() {
        let mut ani = NamedTempFile::new().unwrap();
        writeln!(ani, "comparison,query_name,match_name,lca_rank,lca_lineage,avg_ani").unwrap();
        writeln!(ani, "A_x_B,A,B,genus,G,0.9").unwrap();
        let mut aai = NamedTempFile::new().unwrap();
        writeln!(aai, "comparison,query_name,match_name,lca_rank,lca_lineage,avg_ani").unwrap();
        writeln!(aai, "B_x_A,B,A,genus,G,0.95").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("joined.csv");
        {
            let mut writer = ComparisonWriter::create(&out, &ANI_AAI_COLUMNS).unwrap();
            let summary = combine_ani_aai(ani.path(), aai.path(), &mut writer).unwrap();
            assert_eq!(summary.written, 1);
        }

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with(
            "comparison,query_name,match_name,lca_rank,lca_lineage,fmh_ani,fmh_aai,fmh_dnds"
        ));
        assert!(content.contains("A_x_B,A,B,genus,G,0.9,0.95,"));
    }
}
