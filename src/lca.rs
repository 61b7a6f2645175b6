//! Pairwise lowest common ancestor (LCA) resolution against a lineage database

use crate::taxonomy::{swap_assembly_prefix, Lineage, LineageDb, Rank};
use std::fmt;

/// Why a pair of identifiers has no LCA
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatch {
    /// These identifiers (and their GCF/GCA twins) are not in the taxonomy
    Unresolved(Vec<String>),
    /// At least one identifier is present but has no ranks assigned
    EmptyLineage,
    /// The lineages disagree even at superkingdom
    NoSharedRank,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatch::Unresolved(ids) => write!(f, "not in taxonomy files: {}", ids.join(", ")),
            NoMatch::EmptyLineage => f.write_str("empty lineage"),
            NoMatch::NoSharedRank => f.write_str("no shared rank"),
        }
    }
}

/// Look up an identifier, retrying once with the GCF/GCA prefix swapped
pub fn lookup_lineage<'a>(ident: &str, db: &'a LineageDb) -> Option<&'a Lineage> {
    if let Some(lineage) = db.get(ident) {
        return Some(lineage);
    }
    let swapped = swap_assembly_prefix(ident)?;
    let lineage = db.get(&swapped);
    if lineage.is_some() {
        log::debug!("{} found as {}", ident, swapped);
    }
    lineage
}

/// Deepest rank at which both lineages agree, as a truncated lineage
pub fn lineages_lca(a: &Lineage, b: &Lineage) -> Option<Lineage> {
    Rank::ascending()
        .find(|rank| a.matches_at(b, *rank))
        .map(|rank| a.pop_to_rank(rank))
}

/// Resolve the LCA lineage of two identifiers.
///
/// Unresolved identifiers are logged as warnings and reported in
/// [`NoMatch::Unresolved`]; the database is never modified.
pub fn resolve(id1: &str, id2: &str, db: &LineageDb) -> Result<Lineage, NoMatch> {
    let lin1 = lookup_lineage(id1, db);
    let lin2 = lookup_lineage(id2, db);

    let (lin1, lin2) = match (lin1, lin2) {
        (Some(a), Some(b)) => (a, b),
        (lin1, lin2) => {
            let mut missing = Vec::new();
            if lin1.is_none() {
                log::warn!("{} is not in taxonomy files", id1);
                missing.push(id1.to_string());
            }
            if lin2.is_none() {
                log::warn!("{} is not in taxonomy files", id2);
                missing.push(id2.to_string());
            }
            return Err(NoMatch::Unresolved(missing));
        }
    };

    if lin1.is_empty() || lin2.is_empty() {
        return Err(NoMatch::EmptyLineage);
    }

    lineages_lca(lin1, lin2).ok_or(NoMatch::NoSharedRank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_db() -> LineageDb {
        [
            ("A", vec!["Bacteria", "X", "Y"]),
            ("B", vec!["Bacteria", "X", "Z"]),
            ("D", vec!["Bacteria", "X", "Y"]),
            ("E", vec!["Archaea", "X", "Y"]),
            ("GCA_100", vec!["Bacteria", "Q"]),
            ("GCF_200", vec!["Bacteria", "X", "Y", "O", "F", "G", "S"]),
            ("EMPTY", vec![]),
        ]
        .into_iter()
        .map(|(id, names)| (id.to_string(), Lineage::from_names(names)))
        .collect()
    }

    #[test]
    fn test_resolve_shared_class() {
        let db = test_db();
        let lca = resolve("A", "B", &db).unwrap();

        assert_eq!(lca, Lineage::from_names(["Bacteria", "X"]));
        let last = lca.last().unwrap();
        assert_eq!(last.rank, Rank::Phylum);
        assert_eq!(last.name, "X");
    }

    #[test]
    fn test_resolve_identical_lineages() {
        let db = test_db();
        assert_eq!(
            resolve("A", "D", &db).unwrap(),
            Lineage::from_names(["Bacteria", "X", "Y"])
        );
    }

    #[test]
    fn test_resolve_superkingdom_only() {
        let db = test_db();
        let lca = resolve("B", "GCA_100", &db).unwrap();
        assert_eq!(lca.len(), 1);
        assert_eq!(lca.last().unwrap().rank, Rank::Superkingdom);
    }

    #[test]
    fn test_resolve_no_shared_rank() {
        let db = test_db();
        assert_eq!(resolve("A", "E", &db), Err(NoMatch::NoSharedRank));
    }

    #[test]
    fn test_resolve_swapped_prefix() {
        let db = test_db();
        let lca = resolve("GCF_100", "GCA_200", &db).unwrap();
        assert_eq!(lca, Lineage::from_names(["Bacteria"]));
    }

    #[test]
    fn test_resolve_unresolved_reports_ids() {
        let db = test_db();
        assert_eq!(
            resolve("A", "C", &db),
            Err(NoMatch::Unresolved(vec!["C".to_string()]))
        );
        assert_eq!(
            resolve("GCF_999", "C", &db),
            Err(NoMatch::Unresolved(vec!["GCF_999".to_string(), "C".to_string()]))
        );
    }

    #[test]
    fn test_resolve_empty_lineage() {
        let db = test_db();
        assert_eq!(resolve("EMPTY", "A", &db), Err(NoMatch::EmptyLineage));
    }

    #[test]
    fn test_lookup_prefers_direct_hit() {
        let db: LineageDb = [
            ("GCF_1".to_string(), Lineage::from_names(["Bacteria"])),
            ("GCA_1".to_string(), Lineage::from_names(["Archaea"])),
        ]
        .into_iter()
        .collect();

        assert_eq!(lookup_lineage("GCF_1", &db).unwrap().to_string(), "Bacteria");
        assert_eq!(lookup_lineage("GCA_1", &db).unwrap().to_string(), "Archaea");
        assert!(lookup_lineage("XYZ", &db).is_none());
    }

    #[test]
    fn test_lineages_lca_full_depth() {
        let full = Lineage::from_names(["Bacteria", "X", "Y", "O", "F", "G", "S"]);
        assert_eq!(lineages_lca(&full, &full), Some(full.clone()));
        assert_eq!(lineages_lca(&full, &Lineage::default()), None);
    }

    #[test]
    fn test_resolve_across_unassigned_rank() {
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "ident,superkingdom,phylum,class,order,family,genus,species").unwrap();
        writeln!(tax, "A,Bacteria,X,,O,F,G,S").unwrap();
        writeln!(tax, "B,Bacteria,X,,O,F,G,S").unwrap();
        writeln!(tax, "C,Bacteria,X,,O2,F2,G2,S2").unwrap();
        let db = LineageDb::load(&[tax.path()]).unwrap();

        let lca = resolve("A", "B", &db).unwrap();
        assert_eq!(lca.len(), 7);
        let last = lca.last().unwrap();
        assert_eq!(last.rank, Rank::Species);
        assert_eq!(last.name, "S");

        let lca = resolve("A", "C", &db).unwrap();
        assert_eq!(lca.to_string(), "Bacteria;X;");
        assert_eq!(lca.len(), 3);
        assert_eq!(lca.last().unwrap().rank, Rank::Class);
        assert_eq!(lca.last().unwrap().name, "");
    }

    #[test]
    fn test_unassigned_rank_does_not_match_assigned() {
        let a = Lineage::from_names(["Bacteria", "X", "", "O"]);
        let b = Lineage::from_names(["Bacteria", "X", "Y", "O"]);
        assert_eq!(lineages_lca(&a, &b), Some(Lineage::from_names(["Bacteria", "X"])));
    }

    #[test]
    fn test_no_match_display() {
        assert_eq!(
            NoMatch::Unresolved(vec!["C".to_string()]).to_string(),
            "not in taxonomy files: C"
        );
    }
}
