use std::fmt::{self, Display, Formatter};

/// Index of a chromosome within the run's chromosome table.
pub type ChromosomeId = u16;

/// Chromosome id assigned to loci absent from the chromosome map file.
pub const UNKNOWN_CHROMOSOME: ChromosomeId = ChromosomeId::MAX;

/// A genotyped marker.
///
/// - `index`      : 0-based position within the input file's locus list.
/// - `name`       : short locus name, from the input header.
/// - `chromosome` : index into the run's chromosome table, when a map file
///                  was provided.
/// - `dropped`    : true when the user's locus-range restriction excludes
///                  this locus from every estimator.
///
/// Created at input parse, immutable thereafter (`drop()` is applied before
/// any estimator runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub index      : usize,
    pub name       : String,
    pub chromosome : Option<ChromosomeId>,
    dropped        : bool,
}

impl Locus {
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>) -> Locus {
        Locus { index, name: name.into(), chromosome: None, dropped: false }
    }

    pub fn drop_from_analysis(&mut self) {
        self.dropped = true;
    }

    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.dropped
    }
}

impl Display for Locus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The run-wide ordered list of loci. Shared by every population sample of
/// one input file.
#[derive(Debug, Clone, Default)]
pub struct LocusSet(Vec<Locus>);

impl LocusSet {
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = String>) -> LocusSet {
        LocusSet(names.into_iter().enumerate().map(|(i, name)| Locus::new(i, name)).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self) -> &[Locus] {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut [Locus] {
        &mut self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locus> {
        self.0.iter()
    }

    /// Keep only loci whose index falls within one of the (inclusive,
    /// 1-based) user ranges; every other locus is dropped from analysis.
    pub fn restrict_to_ranges(&mut self, ranges: &[(usize, usize)]) {
        if ranges.is_empty() {
            return
        }
        for locus in &mut self.0 {
            let keep = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&(locus.index + 1)));
            if !keep {
                locus.drop_from_analysis();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_loci() -> LocusSet {
        LocusSet::new(["L1", "L2", "L3"].map(String::from))
    }

    #[test]
    fn locus_set_indexing() {
        let loci = three_loci();
        assert_eq!(loci.len(), 3);
        assert_eq!(loci.get()[1].name, "L2");
        assert_eq!(loci.get()[1].index, 1);
        assert!(!loci.get()[1].is_dropped());
    }

    #[test]
    fn range_restriction_is_one_based_inclusive() {
        let mut loci = three_loci();
        loci.restrict_to_ranges(&[(2, 3)]);
        assert!( loci.get()[0].is_dropped());
        assert!(!loci.get()[1].is_dropped());
        assert!(!loci.get()[2].is_dropped());
    }

    #[test]
    fn empty_ranges_keep_everything() {
        let mut loci = three_loci();
        loci.restrict_to_ranges(&[]);
        assert!(loci.iter().all(|l| !l.is_dropped()));
    }
}
