//! SQLite store of LCA comparisons

use crate::{
    comparison::BatchSummary,
    lca::resolve,
    prefetch::for_each_prefetch_row,
    stats::AniSummary,
    taxonomy::{get_ident, LineageDb, Rank},
    KmerConfig, LcaAniResult,
};
use rusqlite::{params, Connection};
use std::path::Path;

/// A row of the `comparisons` table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredComparison {
    pub ident1: String,
    pub ident2: String,
    pub lca_rank: String,
    pub lca_name: String,
    pub ani: f64,
}

pub struct ComparisonDb {
    conn: Connection,
}

impl ComparisonDb {
    pub fn open<P: AsRef<Path>>(path: P) -> LcaAniResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> LcaAniResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> LcaAniResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS comparisons (
                ident1 TEXT NOT NULL,
                ident2 TEXT NOT NULL,
                lca_rank TEXT NOT NULL,
                lca_name TEXT NOT NULL,
                ani FLOAT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Insert rows in a single transaction
    pub fn insert_batch(&mut self, rows: &[StoredComparison]) -> LcaAniResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO comparisons (ident1, ident2, lca_rank, lca_name, ani)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.ident1,
                    row.ident2,
                    row.lca_rank,
                    row.lca_name,
                    row.ani
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn count(&self) -> LcaAniResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM comparisons", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Min / mean / max ANI of comparisons whose LCA is at `rank`
    pub fn rank_ani_stats(&self, rank: Rank) -> LcaAniResult<Option<AniSummary>> {
        self.ani_stats("lca_rank", rank.as_str())
    }

    /// Min / mean / max ANI of comparisons whose LCA is the taxon `lca_name`
    pub fn lca_name_ani_stats(&self, lca_name: &str) -> LcaAniResult<Option<AniSummary>> {
        self.ani_stats("lca_name", lca_name)
    }

    fn ani_stats(&self, column: &str, value: &str) -> LcaAniResult<Option<AniSummary>> {
        let sql = format!(
            "SELECT MIN(ani), AVG(ani), MAX(ani) FROM comparisons WHERE {}=?1",
            column
        );
        let (min, avg, max): (Option<f64>, Option<f64>, Option<f64>) =
            self.conn.query_row(&sql, params![value], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

        Ok(match (min, avg, max) {
            (Some(min), Some(avg), Some(max)) => Some(AniSummary { min, avg, max }),
            _ => None,
        })
    }
}

/// Resolve LCAs for prefetch comparisons and append them to the store.
///
/// Full query/match names are stored; rows without an average ANI are skipped.
pub fn prefetch_to_lca_db<P: AsRef<Path>>(
    inputs: &[P],
    lineages: &LineageDb,
    config: &KmerConfig,
    db: &mut ComparisonDb,
) -> LcaAniResult<BatchSummary> {
    let mut summary = BatchSummary::default();

    for input in inputs {
        log::info!("Reading prefetch CSV {:?}", input.as_ref());
        let mut batch = Vec::new();
        let rows = for_each_prefetch_row(input, |row| {
            let lca = match resolve(&get_ident(&row.query_name), &get_ident(&row.match_name), lineages) {
                Ok(lca) => lca,
                Err(reason) => {
                    summary.record_no_match(reason);
                    return Ok(());
                }
            };
            let (Some(last), Some(ani)) = (lca.last(), row.ani(config).avg_ani) else {
                summary.degenerate += 1;
                return Ok(());
            };
            batch.push(StoredComparison {
                ident1: row.query_name,
                ident2: row.match_name,
                lca_rank: last.rank.to_string(),
                lca_name: last.name.clone(),
                ani,
            });
            Ok(())
        })?;
        summary.rows_read += rows;
        summary.written += db.insert_batch(&batch)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Lineage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn stored(rank: &str, name: &str, ani: f64) -> StoredComparison {
        StoredComparison {
            ident1: "q".to_string(),
            ident2: "m".to_string(),
            lca_rank: rank.to_string(),
            lca_name: name.to_string(),
            ani,
        }
    }

    #[test]
    fn test_rank_stats() {
        let mut db = ComparisonDb::open_in_memory().unwrap();
        db.insert_batch(&[
            stored("genus", "G1", 0.8),
            stored("genus", "G2", 0.9),
            stored("species", "S", 0.99),
        ])
        .unwrap();

        assert_eq!(db.count().unwrap(), 3);

        let genus = db.rank_ani_stats(Rank::Genus).unwrap().unwrap();
        assert_eq!(genus.min, 0.8);
        assert_eq!(genus.max, 0.9);
        assert!((genus.avg - 0.85).abs() < 1e-12);

        assert!(db.rank_ani_stats(Rank::Phylum).unwrap().is_none());

        let g1 = db.lca_name_ani_stats("G1").unwrap().unwrap();
        assert_eq!(g1.min, 0.8);
        assert!(db.lca_name_ani_stats("nope").unwrap().is_none());
    }

    #[test]
    fn test_open_existing_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ani.db");
        {
            let mut db = ComparisonDb::open(&path).unwrap();
            db.insert_batch(&[stored("genus", "G", 0.9)]).unwrap();
        }
        let mut db = ComparisonDb::open(&path).unwrap();
        db.insert_batch(&[stored("genus", "G", 0.8)]).unwrap();
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_prefetch_to_lca_db() {
        let mut prefetch = NamedTempFile::new().unwrap();
        writeln!(prefetch, "query_name,match_name,query_ani,match_ani").unwrap();
        writeln!(prefetch, "GCF_1.1 first,GCF_2.1 second,0.9,1.0").unwrap();
        writeln!(prefetch, "GCF_1.1 first,GCF_3.1 third,0.8,0.8").unwrap();
        writeln!(prefetch, "GCF_1.1 first,GCF_2.1 second,,").unwrap();

        let lineages: LineageDb = [
            ("GCF_1", vec!["Bacteria", "X", "Y"]),
            ("GCF_2", vec!["Bacteria", "X", "Z"]),
        ]
        .into_iter()
        .map(|(id, names)| (id.to_string(), Lineage::from_names(names)))
        .collect();

        let mut db = ComparisonDb::open_in_memory().unwrap();
        let summary =
            prefetch_to_lca_db(&[prefetch.path()], &lineages, &KmerConfig::default(), &mut db).unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.no_lca, 1);
        assert_eq!(summary.degenerate, 1);

        let phylum = db.rank_ani_stats(Rank::Phylum).unwrap().unwrap();
        assert_eq!(phylum.avg, 0.95);
        let ident1: String = db
            .conn
            .query_row("SELECT ident1 FROM comparisons", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ident1, "GCF_1.1 first");
    }
}
