//! Reference ("linref") ANI tables: genome ids are mapped to assembly
//! accessions as rows stream by, then each pair gets an LCA.

use crate::{
    comparison::{BatchSummary, ComparisonSet, ComparisonWriter},
    lca::resolve,
    taxonomy::{get_ident, LineageDb},
    utils::{csv_reader, log_progress},
    ComparisonRecord, LcaAniResult,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Stat column of the linref LCA table
pub const LINREF_COLUMNS: [&str; 1] = ["ani"];

/// One row of a reference ANI CSV
#[derive(Debug, Clone, Deserialize)]
pub struct LinrefRow {
    #[serde(rename = "Genome_ID")]
    pub genome_id: String,
    #[serde(rename = "AssemblyID")]
    pub assembly_id: String,
    #[serde(rename = "SubjectGenome")]
    pub subject_genome: String,
    /// Blank cells are carried through as missing values
    #[serde(rename = "ANI", default)]
    pub ani: Option<f64>,
}

/// Running genome id -> accession map.
///
/// Rows are ordered so that a subject's own row precedes its use as a
/// subject; subjects not yet seen cannot be named.
#[derive(Debug, Default)]
pub struct AccessionMap {
    accessions: HashMap<String, String>,
}

impl AccessionMap {
    /// Register the row's query and return its accession (version dropped)
    pub fn register(&mut self, row: &LinrefRow) -> String {
        let accession = get_ident(&row.assembly_id);
        self.accessions
            .insert(row.genome_id.clone(), accession.clone());
        accession
    }

    pub fn get(&self, genome_id: &str) -> Option<&str> {
        self.accessions.get(genome_id).map(|s| s.as_str())
    }
}

/// Assign LCAs to every reference comparison and write the LCA ANI table
pub fn linref_to_lca_csv<P: AsRef<Path>>(
    inputs: &[P],
    lineages: &LineageDb,
    writer: &mut ComparisonWriter,
) -> LcaAniResult<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut comparisons = ComparisonSet::new();
    let mut accessions = AccessionMap::default();

    for input in inputs {
        log::info!("Reading linref CSV {:?}", input.as_ref());
        let mut reader = csv_reader(input)?;
        for (n, result) in reader.deserialize::<LinrefRow>().enumerate() {
            log_progress(n);
            let row = result?;
            summary.rows_read += 1;

            let query_acc = accessions.register(&row);
            let subject_acc = match accessions.get(&row.subject_genome) {
                Some(acc) => acc.to_string(),
                None => {
                    summary.missing_ids.insert(row.subject_genome.clone());
                    summary.missing_partner += 1;
                    continue;
                }
            };

            if !comparisons.insert_pair(&query_acc, &subject_acc) {
                summary.duplicates += 1;
                continue;
            }

            match resolve(&query_acc, &subject_acc, lineages) {
                Ok(lca) => {
                    if let Some(record) = ComparisonRecord::from_lca(&query_acc, &subject_acc, &lca) {
                        if row.ani.is_none() {
                            summary.degenerate += 1;
                        }
                        writer.write(&record, &[row.ani])?;
                        summary.written += 1;
                    }
                }
                Err(reason) => summary.record_no_match(reason),
            }
        }
    }

    writer.flush()?;
    Ok(summary)
}
