fn main() {
    println!("lca-ani-rs - LCA-annotated comparison tables for sourmash");
    println!();
    println!("Build comparison tables (one row per genome pair, with the rank and name");
    println!("of the pair's lowest common ancestor):");
    println!("  prefetch_to_ani_csv  - sourmash prefetch CSVs + taxonomy → LCA ANI CSV");
    println!("  linref_to_lca_csv    - reference ANI CSVs + taxonomy → LCA ANI CSV");
    println!("  prefetch_to_lca_sql  - sourmash prefetch CSVs + taxonomy → SQLite store");
    println!();
    println!("Join and summarize:");
    println!("  combine_ani_csvs     - reference ANI × sourmash ANI (ref_ani, fmh_ani)");
    println!("  combine_ani_aai_csvs - sourmash ANI × sourmash AAI (fmh_ani, fmh_aai, fmh_dnds)");
    println!("  get_lca_ani          - min/avg/max ANI per LCA rank from the SQLite store");
    println!("  density_dist         - ANI/AAI density per LCA rank (CSV + SVG)");
    println!();
    println!("For help with each tool:");
    println!("  cargo run --bin prefetch_to_ani_csv -- --help");
    println!();
    println!("Quick start example:");
    println!("  cargo run --bin prefetch_to_ani_csv -- prefetch.csv -t gtdb-taxonomy.csv -o lca-ani.csv");
    println!("  cargo run --bin density_dist -- --sourmash-ani-csv lca-ani.csv --ksize 31");
}
