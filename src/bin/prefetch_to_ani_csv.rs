//! CLI binary: sourmash prefetch CSV(s) -> LCA ANI table

use clap::Parser;
use lca_ani_rs::{
    comparison::ComparisonWriter,
    prefetch::{prefetch_to_ani_csv, ANI_COLUMNS},
    taxonomy::LineageDb,
    utils::{collect_input_paths, init_logging, prepare_output, validate_file_readable, Timer},
    validate_kmer_config, KmerConfig, LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prefetch_to_ani_csv")]
#[command(about = "Build an LCA ANI table from sourmash prefetch CSVs")]
#[command(long_about = "
Reads one or more sourmash prefetch CSVs, looks up the lineage of each query
and match in the taxonomy files, and writes one row per genome pair with the
rank and name of their lowest common ancestor (LCA).

Identifiers are the first word of each name with the version suffix removed.
Identifiers missing from the taxonomy are retried once with the GCF/GCA
prefix swapped. Pairs seen before in either orientation are skipped, as are
pairs without an LCA.

When query_ani / match_ani are absent, ANI is estimated from the containment
columns (f_query_match, f_match_query) using the row's ksize, or --ksize.
")]
struct Args {
    /// Prefetch CSV files
    #[arg(value_name = "PREFETCH_CSVS")]
    prefetch_csvs: Vec<PathBuf>,

    /// File containing paths to prefetch CSVs, one per line
    #[arg(long, visible_alias = "prefetch-from-file", value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Taxonomy CSV files
    #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
    taxonomy_csvs: Vec<PathBuf>,

    /// Path to the output CSV file
    #[arg(short, long, value_name = "FILE")]
    output_csv: PathBuf,

    /// K-mer size for rows without a ksize column
    #[arg(long)]
    ksize: Option<u32>,

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

    log::info!("Starting prefetch -> LCA ANI conversion");
    log::info!("Taxonomy files: {:?}", args.taxonomy_csvs);
    log::info!("Output file: {:?}", args.output_csv);

    let config = KmerConfig { ksize: args.ksize };
    validate_kmer_config(&config)?;

    let inputs = collect_input_paths(&args.prefetch_csvs, args.from_file.as_deref())?;
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
    let mut writer = ComparisonWriter::create(&args.output_csv, &ANI_COLUMNS)?;
    let summary = prefetch_to_ani_csv(&inputs, &lineages, &config, &mut writer)?;
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
            eprintln!("Please check that your prefetch CSVs are properly formatted.");
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
            eprintln!("Please check that query_name, match_name and the ANI columns are present.");
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
            "prefetch_to_ani_csv",
            "a.csv",
            "b.csv",
            "--prefetch-from-file",
            "list.txt",
            "-t",
            "tax1.csv",
            "tax2.csv",
            "-o",
            "out.csv",
            "--ksize",
            "31",
        ])
        .unwrap();

        assert_eq!(args.prefetch_csvs.len(), 2);
        assert_eq!(args.from_file, Some(PathBuf::from("list.txt")));
        assert_eq!(args.taxonomy_csvs.len(), 2);
        assert_eq!(args.ksize, Some(31));
        assert!(!args.force);
    }

    #[test]
    fn test_args_require_taxonomy() {
        assert!(Args::try_parse_from(["prefetch_to_ani_csv", "a.csv", "-o", "out.csv"]).is_err());
    }
}
