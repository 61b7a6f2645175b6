//! CLI binary: reference (linref) ANI CSV(s) -> LCA ANI table

use clap::Parser;
use lca_ani_rs::{
    comparison::ComparisonWriter,
    linref::{linref_to_lca_csv, LINREF_COLUMNS},
    taxonomy::LineageDb,
    utils::{collect_input_paths, init_logging, prepare_output, validate_file_readable, Timer},
    LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linref_to_lca_csv")]
#[command(about = "Build an LCA ANI table from reference ANI CSVs")]
#[command(long_about = "
Reads reference ANI tables with the columns Genome_ID, AssemblyID,
SubjectGenome and ANI. Each row's Genome_ID is mapped to its assembly
accession (version removed); the subject's accession comes from an earlier
row. Rows whose subject has not been seen yet are skipped and counted.

Each new genome pair is assigned its lowest common ancestor from the
taxonomy files and written with the reference ANI.
")]
struct Args {
    /// Reference ANI CSV files
    #[arg(value_name = "LINREF_CSVS")]
    linref_csvs: Vec<PathBuf>,

    /// File containing paths to reference ANI CSVs, one per line
    #[arg(long, visible_alias = "linref-from-file", value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Taxonomy CSV files
    #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
    taxonomy_csvs: Vec<PathBuf>,

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

    log::info!("Starting linref -> LCA ANI conversion");
    log::info!("Output file: {:?}", args.output_csv);

    let inputs = collect_input_paths(&args.linref_csvs, args.from_file.as_deref())?;
    for path in inputs.iter().chain(&args.taxonomy_csvs) {
        validate_file_readable(path)?;
    }
    prepare_output(&args.output_csv, args.force)?;

    let lineages = {
        let _timer = Timer::new("Loading taxonomy");
        LineageDb::load(&args.taxonomy_csvs)?
    };
    log::info!("Loaded {} lineages", lineages.len());

    let _timer = Timer::new("Assigning LCAs");
    let mut writer = ComparisonWriter::create(&args.output_csv, &LINREF_COLUMNS)?;
    let summary = linref_to_lca_csv(&inputs, &lineages, &mut writer)?;
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
        }
        LcaAniError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
        }
        LcaAniError::Taxonomy(msg) => {
            eprintln!("Error: Taxonomy error: {}", msg);
            eprintln!("Please check the header of your taxonomy CSVs.");
        }
        LcaAniError::Csv(ref e) => {
            eprintln!("Error: CSV processing error: {}", e);
            eprintln!("Please check that Genome_ID, AssemblyID, SubjectGenome and ANI columns are present.");
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

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "linref_to_lca_csv",
            "ref.csv",
            "--linref-from-file",
            "more.txt",
            "--taxonomy-csvs",
            "tax.csv",
            "--output-csv",
            "out.csv",
            "-f",
        ])
        .unwrap();

        assert_eq!(args.linref_csvs, vec![PathBuf::from("ref.csv")]);
        assert_eq!(args.from_file, Some(PathBuf::from("more.txt")));
        assert!(args.force);
    }
}
