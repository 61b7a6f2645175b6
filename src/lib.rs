//! # lca-ani-rs - LCA-aware ANI tables from sourmash comparisons
//!
//! Small command-line tools that join sourmash comparison tables with a
//! taxonomy, assign each genome pair its lowest common ancestor (LCA), and
//! summarize similarity statistics (ANI, AAI, containment) per rank.

pub mod combine;
pub mod comparison;
pub mod db;
pub mod density;
pub mod lca;
pub mod linref;
pub mod prefetch;
pub mod stats;
pub mod taxonomy;
pub mod utils;

use serde::{Deserialize, Serialize};
use taxonomy::Lineage;

/// Columns shared by every LCA comparison table
pub const COMPARISON_COLUMNS: [&str; 5] = [
    "comparison",
    "query_name",
    "match_name",
    "lca_rank",
    "lca_lineage",
];

/// A genome pair together with its lowest common ancestor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub comparison: String,
    pub query_name: String,
    pub match_name: String,
    pub lca_rank: String,
    /// Name of the taxon at `lca_rank`
    pub lca_lineage: String,
}

impl ComparisonRecord {
    pub fn new(
        comparison: String,
        query_name: String,
        match_name: String,
        lca_rank: String,
        lca_lineage: String,
    ) -> Self {
        Self {
            comparison,
            query_name,
            match_name,
            lca_rank,
            lca_lineage,
        }
    }

    /// Build a record from a resolved LCA lineage. Returns `None` for an empty lineage.
    pub fn from_lca(query_name: &str, match_name: &str, lca: &Lineage) -> Option<Self> {
        let last = lca.last()?;
        Some(Self::new(
            comparison::comparison_name(query_name, match_name),
            query_name.to_string(),
            match_name.to_string(),
            last.rank.to_string(),
            last.name.clone(),
        ))
    }

    /// The five shared columns, in output order
    pub fn fields(&self) -> [&str; 5] {
        [
            self.comparison.as_str(),
            self.query_name.as_str(),
            self.match_name.as_str(),
            self.lca_rank.as_str(),
            self.lca_lineage.as_str(),
        ]
    }
}

/// K-mer parameters used when ANI has to be derived from containment
#[derive(Debug, Clone, Default)]
pub struct KmerConfig {
    /// Fallback k-mer size for rows that do not carry a `ksize` column
    pub ksize: Option<u32>,
}

impl KmerConfig {
    /// The row's own k-mer size wins over the configured fallback
    pub fn effective_ksize(&self, row_ksize: Option<u32>) -> Option<u32> {
        row_ksize.or(self.ksize).filter(|k| *k > 0)
    }
}

/// Validate k-mer configuration parameters
pub fn validate_kmer_config(config: &KmerConfig) -> LcaAniResult<()> {
    if config.ksize == Some(0) {
        return Err(LcaAniError::InvalidConfig(
            "ksize must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Error types for the lca-ani library
#[derive(Debug, thiserror::Error)]
pub enum LcaAniError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Taxonomy error: {0}")]
    Taxonomy(String),
}

pub type LcaAniResult<T> = Result<T, LcaAniError>;
