//! CLI binary: sourmash prefetch CSV(s) -> SQLite comparisons table

use clap::Parser;
use lca_ani_rs::{
    db::{prefetch_to_lca_db, ComparisonDb},
    taxonomy::LineageDb,
    utils::{collect_input_paths, ensure_parent_dirs, init_logging, validate_file_readable, Timer},
    validate_kmer_config, KmerConfig, LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prefetch_to_lca_sql")]
#[command(about = "Load LCA-annotated sourmash prefetch comparisons into SQLite")]
#[command(long_about = "
Reads one or more sourmash prefetch CSVs, assigns each query/match pair its
lowest common ancestor from the taxonomy files, and appends the result to
the `comparisons` table of a SQLite database:

    comparisons(ident1, ident2, lca_rank, lca_name, ani)

The table is created if it does not exist; existing rows are kept. The
stored ANI is the mean of query_ani and match_ani. Pairs without an LCA are
skipped.
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

    /// Path to the SQLite database
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// K-mer size for rows without a ksize column
    #[arg(long)]
    ksize: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn run() -> LcaAniResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    log::info!("Starting prefetch -> SQLite load");
    log::info!("Database: {:?}", args.output);

    let config = KmerConfig { ksize: args.ksize };
    validate_kmer_config(&config)?;

    let inputs = collect_input_paths(&args.prefetch_csvs, args.from_file.as_deref())?;
    for path in inputs.iter().chain(&args.taxonomy_csvs) {
        validate_file_readable(path)?;
    }

    ensure_parent_dirs(&args.output)?;
    let mut db = ComparisonDb::open(&args.output)?;

    let lineages = {
        let _timer = Timer::new("Loading taxonomy");
        LineageDb::load(&args.taxonomy_csvs)?
    };
    log::info!("Loaded {} lineages", lineages.len());

    let _timer = Timer::new("Loading comparisons");
    let summary = prefetch_to_lca_db(&inputs, &lineages, &config, &mut db)?;
    summary.log_summary();

    log::info!("Database now holds {} comparisons", db.count()?);
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
        }
        LcaAniError::Sqlite(ref e) => {
            eprintln!("Error: SQLite error: {}", e);
            eprintln!("Please check that the output is a SQLite database with a compatible comparisons table.");
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
            "prefetch_to_lca_sql",
            "--from-file",
            "list.txt",
            "-t",
            "tax.csv",
            "-o",
            "ani.db",
        ])
        .unwrap();

        assert!(args.prefetch_csvs.is_empty());
        assert_eq!(args.output, PathBuf::from("ani.db"));
        assert_eq!(args.ksize, None);
    }
}
