//! Joins of two LCA comparison tables on the comparison name

use crate::{
    comparison::{comparison_name, BatchSummary, ComparisonWriter},
    stats::dnds_ratio,
    taxonomy::get_ident,
    utils::{csv_reader, log_progress},
    ComparisonRecord, LcaAniError, LcaAniResult,
};
use std::collections::HashMap;
use std::path::Path;

/// Output stat columns of the reference ANI x sourmash ANI join
pub const REF_FMH_COLUMNS: [&str; 2] = ["ref_ani", "fmh_ani"];

/// Output stat columns of the ANI x AAI join
pub const ANI_AAI_COLUMNS: [&str; 3] = ["fmh_ani", "fmh_aai", "fmh_dnds"];

/// Column indices of an LCA comparison table
#[derive(Debug, Clone)]
pub struct LcaColumnIndices {
    pub comparison: usize,
    pub query_name: usize,
    pub match_name: usize,
    pub lca_rank: Option<usize>,
    pub lca_lineage: Option<usize>,
    pub value: usize,
}

impl LcaColumnIndices {
    pub fn from_headers(headers: &csv::StringRecord, value_column: &str) -> LcaAniResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| {
                LcaAniError::InvalidRecord(format!("{} column not found in CSV header", name))
            })
        };

        Ok(LcaColumnIndices {
            comparison: required("comparison")?,
            query_name: required("query_name")?,
            match_name: required("match_name")?,
            lca_rank: position("lca_rank"),
            lca_lineage: position("lca_lineage"),
            value: required(value_column)?,
        })
    }

    fn record(&self, row: &csv::StringRecord) -> ComparisonRecord {
        let field = |idx: usize| row.get(idx).unwrap_or("").to_string();
        ComparisonRecord::new(
            field(self.comparison),
            field(self.query_name),
            field(self.match_name),
            self.lca_rank.map(field).unwrap_or_default(),
            self.lca_lineage.map(field).unwrap_or_default(),
        )
    }

    /// Parse the value column; an empty cell is a missing value
    fn value(&self, row: &csv::StringRecord) -> LcaAniResult<Option<f64>> {
        let text = row.get(self.value).unwrap_or("").trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>().map(Some).map_err(|_| {
            LcaAniError::InvalidRecord(format!("Invalid numeric value: {}", text))
        })
    }
}

/// A row of the left table with the value joined in from the right table
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedComparison {
    pub record: ComparisonRecord,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub matched: bool,
}

/// Left table of a join, kept in input order and indexed by comparison name
#[derive(Debug, Default)]
pub struct ComparisonTable {
    rows: Vec<JoinedComparison>,
    index: HashMap<String, usize>,
}

impl ComparisonTable {
    /// Read a comparison table, taking `value_column` as the left value.
    /// A repeated comparison name replaces the earlier row in place.
    pub fn read<P: AsRef<Path>>(path: P, value_column: &str) -> LcaAniResult<Self> {
        let mut reader = csv_reader(path)?;
        let columns = LcaColumnIndices::from_headers(reader.headers()?, value_column)?;

        let mut table = ComparisonTable::default();
        for result in reader.records() {
            let row = result?;
            let joined = JoinedComparison {
                record: columns.record(&row),
                left: columns.value(&row)?,
                right: None,
                matched: false,
            };
            table.insert(joined);
        }
        Ok(table)
    }

    fn insert(&mut self, joined: JoinedComparison) {
        match self.index.get(&joined.record.comparison) {
            Some(&idx) => self.rows[idx] = joined,
            None => {
                self.index
                    .insert(joined.record.comparison.clone(), self.rows.len());
                self.rows.push(joined);
            }
        }
    }

    /// Find a row by comparison name, falling back to the reversed pair
    fn find(&self, comparison: &str, query_name: &str, match_name: &str) -> Option<usize> {
        self.index.get(comparison).copied().or_else(|| {
            let reverse = comparison_name(&get_ident(match_name), &get_ident(query_name));
            self.index.get(&reverse).copied()
        })
    }

    /// Join `value_column` of the right table onto matching rows
    pub fn join<P: AsRef<Path>>(&mut self, path: P, value_column: &str) -> LcaAniResult<BatchSummary> {
        let mut reader = csv_reader(path)?;
        let columns = LcaColumnIndices::from_headers(reader.headers()?, value_column)?;

        let mut summary = BatchSummary::default();
        for (n, result) in reader.records().enumerate() {
            log_progress(n);
            let row = result?;
            summary.rows_read += 1;

            let record = columns.record(&row);
            match self.find(&record.comparison, &record.query_name, &record.match_name) {
                Some(idx) => {
                    let joined = &mut self.rows[idx];
                    joined.right = columns.value(&row)?;
                    joined.matched = true;
                }
                None => {
                    summary.missing_partner += 1;
                    summary.missing_ids.insert(record.comparison);
                }
            }
        }
        Ok(summary)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that found a partner, in left-table order
    pub fn matched(&self) -> impl Iterator<Item = &JoinedComparison> {
        self.rows.iter().filter(|r| r.matched)
    }

    /// Write matched rows with `stats` computed from (left, right)
    pub fn write_matched<F>(&self, writer: &mut ComparisonWriter, stats: F) -> LcaAniResult<usize>
    where
        F: Fn(&JoinedComparison) -> Vec<Option<f64>>,
    {
        let mut written = 0;
        for joined in self.matched() {
            writer.write(&joined.record, &stats(joined))?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }
}

/// Join a reference ANI table (`ani`) with a sourmash ANI table (`avg_ani`)
pub fn combine_ref_fmh<P: AsRef<Path>>(
    ref_csv: P,
    fmh_csv: P,
    writer: &mut ComparisonWriter,
) -> LcaAniResult<BatchSummary> {
    let mut table = ComparisonTable::read(ref_csv, "ani")?;
    log::info!("Read {} reference comparisons", table.len());

    let mut summary = table.join(fmh_csv, "avg_ani")?;
    summary.written = table.write_matched(writer, |j| vec![j.left, j.right])?;
    Ok(summary)
}

/// Join nucleotide (`avg_ani`) and protein (`avg_ani`) sourmash tables, adding dN/dS
pub fn combine_ani_aai<P: AsRef<Path>>(
    ani_csv: P,
    aai_csv: P,
    writer: &mut ComparisonWriter,
) -> LcaAniResult<BatchSummary> {
    let mut table = ComparisonTable::read(ani_csv, "avg_ani")?;
    log::info!("Read {} nucleotide comparisons", table.len());

    let mut summary = table.join(aai_csv, "avg_ani")?;
    summary.written = table.write_matched(writer, |j| {
        let dnds = j.left.zip(j.right).and_then(|(ani, aai)| dnds_ratio(ani, aai));
        if dnds.is_none() {
            log::debug!("{}: no dN/dS ratio", j.record.comparison);
        }
        vec![j.left, j.right, dnds]
    })?;
    Ok(summary)
}
