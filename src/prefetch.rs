//! sourmash prefetch tables: typed rows and the prefetch -> LCA ANI conversion

use crate::{
    comparison::{BatchSummary, ComparisonSet, ComparisonWriter},
    lca::resolve,
    stats::{containment_to_ani, mean, mean_present},
    taxonomy::{get_ident, LineageDb},
    utils::{csv_reader, log_progress},
    ComparisonRecord, KmerConfig, LcaAniResult,
};
use serde::Deserialize;
use std::path::Path;

/// Stat columns written after the shared comparison columns
pub const ANI_COLUMNS: [&str; 4] = ["query_ani", "match_ani", "avg_ani", "avg_containment"];

/// One row of a sourmash prefetch CSV. Unlisted columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchRow {
    pub query_name: String,
    pub match_name: String,
    #[serde(default)]
    pub query_ani: Option<f64>,
    #[serde(default)]
    pub match_ani: Option<f64>,
    /// Fraction of the query found in the match
    #[serde(default)]
    pub f_query_match: Option<f64>,
    /// Fraction of the match found in the query
    #[serde(default)]
    pub f_match_query: Option<f64>,
    #[serde(default)]
    pub ksize: Option<u32>,
}

/// ANI values for one prefetch comparison
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrefetchAni {
    pub query_ani: Option<f64>,
    pub match_ani: Option<f64>,
    pub avg_ani: Option<f64>,
    pub avg_containment: Option<f64>,
}

impl PrefetchAni {
    pub fn as_stats(&self) -> [Option<f64>; 4] {
        [self.query_ani, self.match_ani, self.avg_ani, self.avg_containment]
    }
}

impl PrefetchRow {
    /// Reported ANI values, falling back to containment-derived estimates
    pub fn ani(&self, config: &KmerConfig) -> PrefetchAni {
        let ksize = config.effective_ksize(self.ksize);
        let derive = |containment: Option<f64>| {
            containment.zip(ksize).and_then(|(c, k)| containment_to_ani(c, k))
        };

        let query_ani = self.query_ani.or_else(|| derive(self.f_query_match));
        let match_ani = self.match_ani.or_else(|| derive(self.f_match_query));
        let avg_containment = match (self.f_query_match, self.f_match_query) {
            (Some(a), Some(b)) => mean(&[a, b]),
            _ => None,
        };

        PrefetchAni {
            query_ani,
            match_ani,
            avg_ani: mean_present(&[query_ani, match_ani]),
            avg_containment,
        }
    }
}

/// Stream the typed rows of one prefetch CSV into `f`
pub fn for_each_prefetch_row<P, F>(path: P, mut f: F) -> LcaAniResult<usize>
where
    P: AsRef<Path>,
    F: FnMut(PrefetchRow) -> LcaAniResult<()>,
{
    let mut reader = csv_reader(path)?;
    let mut n = 0;
    for result in reader.deserialize::<PrefetchRow>() {
        log_progress(n);
        f(result?)?;
        n += 1;
    }
    Ok(n)
}

/// Assign LCAs to every prefetch comparison and write the LCA ANI table.
///
/// Comparisons are keyed on normalized identifiers; a pair already seen in
/// either orientation, in any input file, is skipped.
pub fn prefetch_to_ani_csv<P: AsRef<Path>>(
    inputs: &[P],
    lineages: &LineageDb,
    config: &KmerConfig,
    writer: &mut ComparisonWriter,
) -> LcaAniResult<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut comparisons = ComparisonSet::new();

    for input in inputs {
        log::info!("Reading prefetch CSV {:?}", input.as_ref());
        let rows = for_each_prefetch_row(input, |row| {
            let query_id = get_ident(&row.query_name);
            let match_id = get_ident(&row.match_name);

            if !comparisons.insert_pair(&query_id, &match_id) {
                summary.duplicates += 1;
                return Ok(());
            }

            let lca = match resolve(&query_id, &match_id, lineages) {
                Ok(lca) => lca,
                Err(reason) => {
                    summary.record_no_match(reason);
                    return Ok(());
                }
            };

            let ani = row.ani(config);
            if ani.avg_ani.is_none() {
                summary.degenerate += 1;
            }
            if let Some(record) = ComparisonRecord::from_lca(&query_id, &match_id, &lca) {
                writer.write(&record, &ani.as_stats())?;
                summary.written += 1;
            }
            Ok(())
        })?;
        summary.rows_read += rows;
    }

    writer.flush()?;
    Ok(summary)
}
