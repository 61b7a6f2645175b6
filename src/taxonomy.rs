//! Taxonomic ranks, lineages and the identifier -> lineage database

use crate::{utils::csv_reader, LcaAniError, LcaAniResult};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Canonical taxonomic ranks, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Superkingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// All ranks from superkingdom down to species
    pub const ALL: [Rank; 7] = [
        Rank::Superkingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Ranks from species up to superkingdom
    pub fn ascending() -> impl Iterator<Item = Rank> {
        Self::ALL.into_iter().rev()
    }

    /// Position in the canonical order (superkingdom = 0)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Superkingdom => "superkingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = LcaAniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superkingdom" | "domain" => Ok(Rank::Superkingdom),
            "phylum" => Ok(Rank::Phylum),
            "class" => Ok(Rank::Class),
            "order" => Ok(Rank::Order),
            "family" => Ok(Rank::Family),
            "genus" => Ok(Rank::Genus),
            "species" => Ok(Rank::Species),
            other => Err(LcaAniError::Taxonomy(format!("Unknown rank: {}", other))),
        }
    }
}

/// One (rank, name) assignment within a lineage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineagePair {
    pub rank: Rank,
    pub name: String,
}

/// Ordered taxonomic assignments, broadest first.
///
/// The i-th pair always carries the i-th canonical rank. Unassigned ranks
/// inside the lineage keep an empty name; trailing unassigned ranks are
/// dropped, so the last pair is always named.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Lineage {
    pairs: Vec<LineagePair>,
}

impl Lineage {
    /// Assign names to ranks in canonical order, trimming trailing empty names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs: Vec<LineagePair> = Rank::ALL
            .iter()
            .zip(names)
            .map(|(rank, name)| LineagePair {
                rank: *rank,
                name: name.as_ref().trim().to_string(),
            })
            .collect();
        while pairs.last().is_some_and(|p| p.name.is_empty()) {
            pairs.pop();
        }
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Finest assigned rank
    pub fn last(&self) -> Option<&LineagePair> {
        self.pairs.last()
    }

    pub fn has_rank(&self, rank: Rank) -> bool {
        self.pairs.len() > rank.index()
    }

    /// Truncate to `rank`. Lineages without that rank come back unchanged.
    pub fn pop_to_rank(&self, rank: Rank) -> Lineage {
        let keep = std::cmp::min(rank.index() + 1, self.pairs.len());
        Lineage {
            pairs: self.pairs[..keep].to_vec(),
        }
    }

    /// Both lineages reach `rank` and agree on every rank down to it.
    /// Unassigned ranks agree with each other.
    pub fn matches_at(&self, other: &Lineage, rank: Rank) -> bool {
        if !self.has_rank(rank) || !other.has_rank(rank) {
            return false;
        }
        let end = rank.index() + 1;
        self.pairs[..end] == other.pairs[..end]
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.pairs.iter().map(|p| p.name.as_str()).collect();
        f.write_str(&names.join(";"))
    }
}

/// Normalize a sequence name to its identifier: first whitespace token, version dropped.
///
/// `"GCF_000005845.2 Escherichia coli"` -> `"GCF_000005845"`
pub fn get_ident(name: &str) -> String {
    let token = name.split_whitespace().next().unwrap_or("");
    token.split('.').next().unwrap_or("").to_string()
}

/// Swap a RefSeq (`GCF`) accession for its GenBank (`GCA`) twin, or the reverse
pub fn swap_assembly_prefix(ident: &str) -> Option<String> {
    if ident.contains("GCF") {
        Some(ident.replace("GCF", "GCA"))
    } else if ident.contains("GCA") {
        Some(ident.replace("GCA", "GCF"))
    } else {
        None
    }
}

/// Header names accepted for the identifier column, in priority order
const IDENT_COLUMNS: [&str; 4] = ["ident", "identifiers", "accession", "name"];

/// Column layout of a taxonomy CSV
#[derive(Debug, Clone)]
enum TaxonomyColumns {
    /// One column per rank; `None` where the rank column is absent
    Ranks { ident: usize, ranks: Vec<Option<usize>> },
    /// A single `;`-separated lineage column
    Joined { ident: usize, lineage: usize },
}

impl TaxonomyColumns {
    fn from_headers(headers: &csv::StringRecord) -> LcaAniResult<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let ident = IDENT_COLUMNS
            .iter()
            .find_map(|&name| position(name))
            .ok_or_else(|| {
                LcaAniError::Taxonomy(format!(
                    "no identifier column found (expected one of: {})",
                    IDENT_COLUMNS.join(", ")
                ))
            })?;

        let ranks: Vec<Option<usize>> = Rank::ALL
            .iter()
            .map(|rank| {
                position(rank.as_str()).or_else(|| match rank {
                    Rank::Superkingdom => position("domain"),
                    _ => None,
                })
            })
            .collect();

        if ranks[0].is_some() {
            return Ok(TaxonomyColumns::Ranks { ident, ranks });
        }
        if let Some(lineage) = position("lineage") {
            return Ok(TaxonomyColumns::Joined { ident, lineage });
        }
        Err(LcaAniError::Taxonomy(
            "no rank columns or lineage column found".to_string(),
        ))
    }

    fn parse(&self, record: &csv::StringRecord) -> (String, Lineage) {
        match self {
            TaxonomyColumns::Ranks { ident, ranks } => {
                let names = ranks
                    .iter()
                    .map(|col| col.and_then(|c| record.get(c)).unwrap_or(""));
                (get_ident(record.get(*ident).unwrap_or("")), Lineage::from_names(names))
            }
            TaxonomyColumns::Joined { ident, lineage } => {
                let text = record.get(*lineage).unwrap_or("");
                let names = text.split(';').map(strip_rank_prefix);
                (get_ident(record.get(*ident).unwrap_or("")), Lineage::from_names(names))
            }
        }
    }
}

/// Drop a GTDB-style rank prefix such as `p__`
fn strip_rank_prefix(name: &str) -> &str {
    let name = name.trim();
    match name.get(1..3) {
        Some("__") => &name[3..],
        _ => name,
    }
}

/// Immutable identifier -> lineage mapping, built once per process
#[derive(Debug, Clone, Default)]
pub struct LineageDb {
    assignments: HashMap<String, Lineage>,
}

impl LineageDb {
    /// Load and merge taxonomy CSVs. Earlier files win on conflicting identifiers.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> LcaAniResult<Self> {
        let mut db = LineageDb::default();
        for path in paths {
            let added = db.load_csv(path.as_ref())?;
            log::info!(
                "Loaded {} lineages from {:?}",
                added,
                path.as_ref()
            );
        }
        if db.is_empty() {
            return Err(LcaAniError::Taxonomy(
                "no lineages loaded from taxonomy files".to_string(),
            ));
        }
        Ok(db)
    }

    fn load_csv(&mut self, path: &Path) -> LcaAniResult<usize> {
        let mut reader = csv_reader(path)?;
        let columns = TaxonomyColumns::from_headers(reader.headers()?)?;

        let mut added = 0;
        for result in reader.records() {
            let record = result?;
            let (ident, lineage) = columns.parse(&record);
            if ident.is_empty() {
                continue;
            }
            match self.assignments.get(&ident) {
                Some(existing) if *existing != lineage => {
                    log::warn!(
                        "{} has conflicting lineages; keeping {} over {}",
                        ident,
                        existing,
                        lineage
                    );
                }
                Some(_) => {}
                None => {
                    self.assignments.insert(ident, lineage);
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Direct lookup, no identifier rewriting
    pub fn get(&self, ident: &str) -> Option<&Lineage> {
        self.assignments.get(ident)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl FromIterator<(String, Lineage)> for LineageDb {
    fn from_iter<T: IntoIterator<Item = (String, Lineage)>>(iter: T) -> Self {
        let mut assignments = HashMap::new();
        for (ident, lineage) in iter {
            assignments.entry(ident).or_insert(lineage);
        }
        Self { assignments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_rank_order() {
        let ascending: Vec<Rank> = Rank::ascending().collect();
        assert_eq!(ascending.first(), Some(&Rank::Species));
        assert_eq!(ascending.last(), Some(&Rank::Superkingdom));
        assert_eq!(ascending.len(), 7);
        assert!(Rank::Superkingdom < Rank::Species);
    }

    #[test]
    fn test_rank_parse() {
        assert_eq!("Genus".parse::<Rank>().unwrap(), Rank::Genus);
        assert_eq!("domain".parse::<Rank>().unwrap(), Rank::Superkingdom);
        assert!("strain".parse::<Rank>().is_err());
        assert_eq!(Rank::Order.to_string(), "order");
    }

    #[test]
    fn test_lineage_from_names_keeps_inner_gaps() {
        let lineage = Lineage::from_names(["Bacteria", "Proteobacteria", "", "Enterobacterales", "", ""]);
        assert_eq!(lineage.len(), 4);
        assert_eq!(lineage.last().unwrap().rank, Rank::Order);
        assert!(lineage.has_rank(Rank::Class));
        assert!(!lineage.has_rank(Rank::Family));
        assert_eq!(lineage.to_string(), "Bacteria;Proteobacteria;;Enterobacterales");

        assert!(Lineage::from_names(["", "", ""]).is_empty());
    }

    #[test]
    fn test_pop_to_rank_and_match() {
        let a = Lineage::from_names(["Bacteria", "X", "Y"]);
        let b = Lineage::from_names(["Bacteria", "X", "Z"]);

        assert_eq!(a.pop_to_rank(Rank::Phylum), Lineage::from_names(["Bacteria", "X"]));
        assert_eq!(a.pop_to_rank(Rank::Species), a);
        assert!(a.matches_at(&b, Rank::Phylum));
        assert!(!a.matches_at(&b, Rank::Class));
        assert!(!a.matches_at(&b, Rank::Order));
    }

    #[test]
    fn test_get_ident() {
        assert_eq!(get_ident("GCF_000005845.2 Escherichia coli K-12"), "GCF_000005845");
        assert_eq!(get_ident("GCA_123"), "GCA_123");
        assert_eq!(get_ident(""), "");
    }

    #[test]
    fn test_swap_assembly_prefix() {
        assert_eq!(swap_assembly_prefix("GCF_1").as_deref(), Some("GCA_1"));
        assert_eq!(swap_assembly_prefix("GCA_1").as_deref(), Some("GCF_1"));
        assert_eq!(swap_assembly_prefix("ABC_1"), None);
    }

    #[test]
    fn test_strip_rank_prefix() {
        assert_eq!(strip_rank_prefix("d__Bacteria"), "Bacteria");
        assert_eq!(strip_rank_prefix(" s__Escherichia coli"), "Escherichia coli");
        assert_eq!(strip_rank_prefix("s__"), "");
        assert_eq!(strip_rank_prefix("Bacteria"), "Bacteria");
    }

    #[test]
    fn test_load_rank_columns() {
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "ident,superkingdom,phylum,class,order,family,genus,species,strain").unwrap();
        writeln!(tax, "GCF_1.1,Bacteria,X,Y,O,F,G,S,").unwrap();
        writeln!(tax, "GCA_2.3,Bacteria,X,,,,,,").unwrap();

        let db = LineageDb::load(&[tax.path()]).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.get("GCF_1").unwrap().len(), 7);
        assert_eq!(db.get("GCA_2").unwrap(), &Lineage::from_names(["Bacteria", "X"]));
        assert!(db.get("GCF_1.1").is_none());
    }

    #[test]
    fn test_load_lineage_column() {
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "accession,lineage").unwrap();
        writeln!(tax, "GCF_9,d__Bacteria;p__X;c__Y;o__;f__;g__;s__").unwrap();

        let db = LineageDb::load(&[tax.path()]).unwrap();
        assert_eq!(db.get("GCF_9").unwrap(), &Lineage::from_names(["Bacteria", "X", "Y"]));
    }

    #[test]
    fn test_load_first_file_wins() {
        let mut first = NamedTempFile::new().unwrap();
        writeln!(first, "ident,superkingdom,phylum").unwrap();
        writeln!(first, "A,Bacteria,X").unwrap();
        let mut second = NamedTempFile::new().unwrap();
        writeln!(second, "ident,superkingdom,phylum").unwrap();
        writeln!(second, "A,Bacteria,Z").unwrap();
        writeln!(second, "B,Archaea,W").unwrap();

        let db = LineageDb::load(&[first.path(), second.path()]).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.get("A").unwrap().last().unwrap().name, "X");
    }

    #[test]
    fn test_load_rejects_missing_ident_column() {
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "genome,superkingdom").unwrap();
        writeln!(tax, "A,Bacteria").unwrap();

        assert!(matches!(
            LineageDb::load(&[tax.path()]),
            Err(LcaAniError::Taxonomy(_))
        ));
    }
}
