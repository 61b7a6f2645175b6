//! CLI binary: per-rank ANI/AAI density table and plot

use clap::Parser;
use lca_ani_rs::{
    density::{
        ani_label, estimate_densities, output_paths, output_stem, read_rank_values,
        render_density_svg, validate_density_config, write_density_table, DensityConfig,
    },
    taxonomy::Rank,
    utils::{init_logging, prepare_output, validate_file_readable, Timer},
    LcaAniError, LcaAniResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "density_dist")]
#[command(about = "Plot the ANI distribution of comparisons per LCA rank")]
#[command(long_about = "
Groups the `avg_ani` column of a prefetch_to_ani_csv output by `lca_rank`
and estimates a Gaussian kernel density for each rank. Writes

    {basename}.{ANI|AAI}.k{ksize}.csv   (lca_rank,ani,density)
    {basename}.{ANI|AAI}.k{ksize}.svg   (filled curves, one per rank)

Ranks are drawn finest first, species through superkingdom.
")]
struct Args {
    /// LCA CSV of sourmash comparisons
    #[arg(long, value_name = "FILE")]
    sourmash_ani_csv: PathBuf,

    /// Values are amino-acid identities (AAI)
    #[arg(long)]
    protein: bool,

    /// Only consider these LCA ranks
    #[arg(long, value_name = "RANK", num_args = 1..)]
    include_ranks: Vec<Rank>,

    /// K-mer size used for the comparisons
    #[arg(long)]
    ksize: u32,

    /// Base name for output files
    #[arg(long, value_name = "NAME", default_value = "gtdb-rs202")]
    output_basename: String,

    /// Number of evaluation points per curve
    #[arg(long, default_value_t = 200)]
    grid_size: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output files if they exist
    #[arg(short, long)]
    force: bool,
}

/// Included ranks, finest first; all ranks when none are given
fn rank_order(include_ranks: &[Rank]) -> Vec<Rank> {
    Rank::ascending()
        .filter(|rank| include_ranks.is_empty() || include_ranks.contains(rank))
        .collect()
}

fn run() -> LcaAniResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    if args.ksize == 0 {
        return Err(LcaAniError::InvalidConfig(
            "ksize must be greater than 0".to_string(),
        ));
    }

    let config = DensityConfig {
        grid_size: args.grid_size,
        include_ranks: rank_order(&args.include_ranks),
        ..DensityConfig::default()
    };
    validate_density_config(&config)?;

    validate_file_readable(&args.sourmash_ani_csv)?;
    let stem = output_stem(&args.output_basename, args.protein, args.ksize);
    let (csv_path, svg_path) = output_paths(&stem);
    prepare_output(&csv_path, args.force)?;
    prepare_output(&svg_path, args.force)?;

    let values = read_rank_values(&args.sourmash_ani_csv, "avg_ani", &config.include_ranks)?;
    log::info!(
        "Ranks present: {}",
        values
            .keys()
            .map(|rank| rank.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let curves = {
        let _timer = Timer::new("Estimating densities");
        estimate_densities(&values, &config)
    };
    if curves.is_empty() {
        return Err(LcaAniError::InvalidRecord(
            "no rank has enough values for a density".to_string(),
        ));
    }

    write_density_table(&curves, &csv_path)?;
    render_density_svg(&curves, ani_label(args.protein), &svg_path)?;

    log::info!("Results written to: {:?} and {:?}", csv_path, svg_path);
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
            eprintln!("The input needs lca_rank and avg_ani columns.");
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

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "density_dist",
            "--sourmash-ani-csv",
            "ani.csv",
            "--protein",
            "--include-ranks",
            "genus",
            "species",
            "--ksize",
            "10",
        ])
        .unwrap();
        assert!(args.protein);
        assert_eq!(args.include_ranks, vec![Rank::Genus, Rank::Species]);
        assert_eq!(args.output_basename, "gtdb-rs202");
        assert_eq!(args.grid_size, 200);
    }

    #[test]
    fn test_args_reject_unknown_rank() {
        assert!(Args::try_parse_from([
            "density_dist",
            "--sourmash-ani-csv",
            "ani.csv",
            "--include-ranks",
            "strain",
            "--ksize",
            "31",
        ])
        .is_err());
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(
            rank_order(&[Rank::Phylum, Rank::Species, Rank::Genus]),
            vec![Rank::Species, Rank::Genus, Rank::Phylum]
        );
        assert_eq!(rank_order(&[]).len(), 7);
        assert_eq!(rank_order(&[]).first(), Some(&Rank::Species));
    }
}
