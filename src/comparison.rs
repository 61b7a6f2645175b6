//! Comparison naming, de-duplication and LCA table output

use crate::{
    lca::NoMatch,
    stats::format_cell,
    utils::{create_writer, OutputWriter},
    ComparisonRecord, LcaAniResult, COMPARISON_COLUMNS,
};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Separator between the two identifiers of a comparison name
pub const COMPARISON_SEPARATOR: &str = "_x_";

/// `"{query}_x_{match}"`
pub fn comparison_name(query: &str, target: &str) -> String {
    format!("{}{}{}", query, COMPARISON_SEPARATOR, target)
}

/// Unordered set of genome pairs already seen
#[derive(Debug, Default)]
pub struct ComparisonSet {
    seen: HashSet<String>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair; `false` if it (or its reverse) was seen before
    pub fn insert_pair(&mut self, query: &str, target: &str) -> bool {
        if self.seen.contains(&comparison_name(target, query)) {
            return false;
        }
        self.seen.insert(comparison_name(query, target))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// CSV writer for LCA comparison tables: the shared columns followed by numeric stat columns
pub struct ComparisonWriter {
    writer: csv::Writer<OutputWriter>,
    n_stats: usize,
    rows: usize,
}

impl ComparisonWriter {
    pub fn create<P: AsRef<Path>>(path: P, stat_columns: &[&str]) -> LcaAniResult<Self> {
        let mut writer = csv::Writer::from_writer(create_writer(path)?);
        let header: Vec<&str> = COMPARISON_COLUMNS
            .iter()
            .chain(stat_columns.iter())
            .copied()
            .collect();
        writer.write_record(&header)?;

        Ok(Self {
            writer,
            n_stats: stat_columns.len(),
            rows: 0,
        })
    }

    /// Write one row. Missing stats become empty cells.
    pub fn write(&mut self, record: &ComparisonRecord, stats: &[Option<f64>]) -> LcaAniResult<()> {
        debug_assert_eq!(stats.len(), self.n_stats);
        let mut row: Vec<String> = record.fields().iter().map(|f| f.to_string()).collect();
        row.extend(stats.iter().map(|s| format_cell(*s)));
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> LcaAniResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Running counts for one batch of comparison inputs
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub rows_read: usize,
    pub written: usize,
    pub duplicates: usize,
    /// Pairs skipped because no LCA could be assigned
    pub no_lca: usize,
    /// Rows skipped because a join partner was never seen
    pub missing_partner: usize,
    /// Rows whose derived value could not be computed
    pub degenerate: usize,
    /// Join partners that were never seen
    pub missing_ids: BTreeSet<String>,
    /// Identifiers absent from the taxonomy
    pub unresolved_ids: BTreeSet<String>,
}

impl BatchSummary {
    /// Count a failed LCA lookup, remembering any unresolved identifiers
    pub fn record_no_match(&mut self, reason: NoMatch) {
        self.no_lca += 1;
        if let NoMatch::Unresolved(ids) = reason {
            self.unresolved_ids.extend(ids);
        }
    }

    pub fn log_summary(&self) {
        log::info!("Batch summary:");
        log::info!("  Rows read: {}", self.rows_read);
        log::info!("  Comparisons written: {}", self.written);
        log::info!("  Duplicate comparisons skipped: {}", self.duplicates);
        if self.missing_partner > 0 {
            log::warn!(
                "missed {} ids, which resulted in {} skipped comparisons",
                self.missing_ids.len(),
                self.missing_partner
            );
        }
        if self.no_lca > 0 {
            log::warn!("could not find LCA for {} comparisons", self.no_lca);
        }
        if self.degenerate > 0 {
            log::warn!("{} comparisons had no usable ANI value", self.degenerate);
        }
        if !self.missing_ids.is_empty() {
            log::warn!("Missing join partners: {}", join_ids(&self.missing_ids));
        }
        if !self.unresolved_ids.is_empty() {
            log::warn!("Not in taxonomy files: {}", join_ids(&self.unresolved_ids));
        }
    }
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_name() {
        assert_eq!(comparison_name("GCF_1", "GCA_2"), "GCF_1_x_GCA_2");
    }

    #[test]
    fn test_comparison_set_dedupes_reverse() {
        let mut set = ComparisonSet::new();
        assert!(set.insert_pair("A", "B"));
        assert!(!set.insert_pair("A", "B"));
        assert!(!set.insert_pair("B", "A"));
        assert!(set.insert_pair("A", "C"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_comparison_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let record = ComparisonRecord::new(
            "A_x_B".to_string(),
            "A".to_string(),
            "B".to_string(),
            "phylum".to_string(),
            "X".to_string(),
        );

        {
            let mut writer = ComparisonWriter::create(&path, &["ani", "aai"]).unwrap();
            writer.write(&record, &[Some(0.95), None]).unwrap();
            assert_eq!(writer.rows_written(), 1);
            writer.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "comparison,query_name,match_name,lca_rank,lca_lineage,ani,aai");
        assert_eq!(lines[1], "A_x_B,A,B,phylum,X,0.95,");
    }

    #[test]
    fn test_comparison_writer_gzip() {
        use crate::utils::csv_reader;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv.gz");
        let record = ComparisonRecord::new(
            "A_x_B".to_string(),
            "A".to_string(),
            "B".to_string(),
            "genus".to_string(),
            "G".to_string(),
        );

        let mut writer = ComparisonWriter::create(&path, &["ani"]).unwrap();
        writer.write(&record, &[Some(0.9)]).unwrap();
        writer.flush().unwrap();

        let mut reader = csv_reader(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][5], "0.9");
    }

    #[test]
    fn test_record_no_match() {
        let mut summary = BatchSummary::default();
        summary.record_no_match(NoMatch::Unresolved(vec!["C".to_string()]));
        summary.record_no_match(NoMatch::NoSharedRank);

        assert_eq!(summary.no_lca, 2);
        assert_eq!(summary.unresolved_ids.len(), 1);
        assert!(summary.unresolved_ids.contains("C"));
        assert!(summary.missing_ids.is_empty());
    }
}
