use crate::{LocusSet, Pcrit, PopulationSample};

/// Outcome of the critical-frequency filter at one locus.
///
/// - `retained`    : ranks (into the locus' allele vector) of alleles passing
///                   the filter, ascending mobility.
/// - `any_dropped` : whether the filter excluded at least one allele.
/// - `k`           : independent-allele count. When nothing was dropped the
///                   frequencies are linearly constrained (they sum to 1),
///                   so one allele is redundant: k = retained - 1. With drops
///                   the constraint is broken and k = retained.
/// - `used`        : the locus participates in estimation (k >= 1, not
///                   monomorphic, not near-monomorphic, not user-dropped).
#[derive(Debug, Clone, Default)]
pub struct LocusEligibility {
    pub retained    : Vec<usize>,
    pub any_dropped : bool,
    pub k           : u32,
    pub used        : bool,
}

impl LocusEligibility {
    fn unused() -> LocusEligibility {
        LocusEligibility::default()
    }
}

/// Per-Pcrit eligibility of every locus of one population sample.
/// References allele nodes by (locus, rank); owns none of them.
#[derive(Debug, Clone)]
pub struct EligibilityMap {
    pcrit : Pcrit,
    loci  : Vec<LocusEligibility>,
}

impl EligibilityMap {
    /// Apply the filter at critical value `pcrit` across all loci.
    #[must_use]
    pub fn build(loci: &LocusSet, sample: &PopulationSample, pcrit: Pcrit) -> EligibilityMap {
        let per_locus = loci.iter().map(|locus| {
            if locus.is_dropped() {
                return LocusEligibility::unused()
            }
            Self::filter_locus(sample, locus.index, pcrit)
        }).collect();
        EligibilityMap { pcrit, loci: per_locus }
    }

    fn filter_locus(sample: &PopulationSample, locus_index: usize, pcrit: Pcrit) -> LocusEligibility {
        let data     = sample.locus(locus_index);
        let n_scored = data.n_scored();
        if n_scored == 0 || data.max_freq() >= 1.0 {
            return LocusEligibility::unused()
        }

        let c = pcrit.effective(n_scored);
        let mut retained    = Vec::with_capacity(data.alleles().len());
        let mut any_dropped = false;
        for (rank, allele) in data.alleles().iter().enumerate() {
            if allele.freq < c {
                any_dropped = true;
            } else if allele.freq > 1.0 - c {
                // A near-monomorphic allele dominates the locus: nothing
                // informative remains once its complement is filtered.
                return LocusEligibility::unused()
            } else {
                retained.push(rank);
            }
        }

        let k = if any_dropped {
            retained.len() as u32
        } else {
            (retained.len() as u32).saturating_sub(1)
        };
        let used = k >= 1;
        LocusEligibility { retained, any_dropped, k, used }
    }

    #[must_use]
    pub fn pcrit(&self) -> Pcrit {
        self.pcrit
    }

    #[must_use]
    pub fn locus(&self, index: usize) -> &LocusEligibility {
        &self.loci[index]
    }

    #[must_use]
    pub fn loci(&self) -> &[LocusEligibility] {
        &self.loci
    }

    /// Indices of loci participating in estimation at this Pcrit.
    pub fn used_loci(&self) -> impl Iterator<Item = usize> + '_ {
        self.loci.iter().enumerate().filter(|(_, l)| l.used).map(|(i, _)| i)
    }

    /// Total independent-allele count over used loci.
    #[must_use]
    pub fn total_independent_alleles(&self) -> u32 {
        self.loci.iter().filter(|l| l.used).map(|l| l.k).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Genotype;

    fn build_map(genotypes: &[&[Genotype]], pcrit: Pcrit) -> (EligibilityMap, PopulationSample) {
        let locus_count = genotypes[0].len();
        let names = (0..locus_count).map(|i| format!("L{i}"));
        let loci  = LocusSet::new(names);
        let mut sample = PopulationSample::new("pop1", locus_count);
        for row in genotypes {
            sample.ingest(row).unwrap();
        }
        sample.finalize();
        let map = EligibilityMap::build(&loci, &sample, pcrit);
        (map, sample)
    }

    #[test]
    fn polymorphic_locus_without_drops() {
        // Two alleles at 0.5 each, no filtering: k = m - 1 = 1.
        let (map, _) = build_map(&[
            &[Genotype(1, 1)],
            &[Genotype(2, 2)],
        ], Pcrit::Value(0.0));
        let locus = map.locus(0);
        assert!(locus.used);
        assert_eq!(locus.k, 1);
        assert_eq!(locus.retained, vec![0, 1]);
        assert!(!locus.any_dropped);
    }

    #[test]
    fn monomorphic_locus_is_unused() {
        let (map, _) = build_map(&[
            &[Genotype(1, 1)],
            &[Genotype(1, 1)],
        ], Pcrit::Value(0.0));
        assert!(!map.locus(0).used);
        assert_eq!(map.locus(0).k, 0);
    }

    #[test]
    fn singleton_dropping() {
        // 10 individuals; allele 3 appears once: freq 0.05 = 1/(2N) < 1/(2N-1).
        let mut rows: Vec<Vec<Genotype>> = vec![vec![Genotype(1, 2)]; 9];
        rows.push(vec![Genotype(1, 3)]);
        let refs: Vec<&[Genotype]> = rows.iter().map(Vec::as_slice).collect();
        let (map, _) = build_map(&refs, Pcrit::DropSingletons);

        let locus = map.locus(0);
        assert!(locus.any_dropped);
        assert!(locus.used);
        // Alleles 1 and 2 survive; with a drop, both count as independent.
        assert_eq!(locus.retained.len(), 2);
        assert_eq!(locus.k, 2);
    }

    #[test]
    fn near_monomorphic_locus_is_unused() {
        // freqs 0.95 / 0.05 at c = 0.1: the rare allele drops and the
        // dominant one exceeds 1 - c.
        let mut rows: Vec<Vec<Genotype>> = vec![vec![Genotype(1, 1)]; 9];
        rows.push(vec![Genotype(1, 2)]);
        let refs: Vec<&[Genotype]> = rows.iter().map(Vec::as_slice).collect();
        let (map, _) = build_map(&refs, Pcrit::Value(0.1));
        assert!(!map.locus(0).used);
    }

    #[test]
    fn filtering_is_per_locus() {
        // Dropping an allele at locus 0 leaves locus 1 untouched.
        let (map, _) = build_map(&[
            &[Genotype(1, 2), Genotype(1, 2)],
            &[Genotype(1, 2), Genotype(1, 2)],
            &[Genotype(1, 3), Genotype(1, 2)],
        ], Pcrit::Value(0.2));
        assert!(map.locus(0).any_dropped);
        assert!(!map.locus(1).any_dropped);
        assert_eq!(map.locus(1).retained.len(), 2);
    }

    #[test]
    fn drop_singletons_with_two_individuals() {
        // c = 1/(2*2-1) = 1/3; heterozygote frequencies 0.25/0.75 and
        // 0.5/0.5 both straddle the [1/3, 2/3] acceptance band awkwardly:
        // a 0.25 allele drops, leaving 0.75 > 2/3 (locus unused); two 0.5
        // alleles are retained with no drop (k = 1, used).
        let (map, _) = build_map(&[
            &[Genotype(1, 1), Genotype(1, 2)],
            &[Genotype(1, 2), Genotype(1, 2)],
        ], Pcrit::DropSingletons);
        assert!(!map.locus(0).used);
        assert!(map.locus(1).used);
    }

    #[test]
    fn zero_scored_locus_is_unused() {
        let (map, _) = build_map(&[
            &[Genotype::MISSING, Genotype(1, 2)],
            &[Genotype::MISSING, Genotype(1, 2)],
        ], Pcrit::Value(0.0));
        assert!(!map.locus(0).used);
        assert!(map.locus(1).used);
    }

    #[test]
    fn total_independent_alleles_sums_used_loci() {
        let (map, _) = build_map(&[
            &[Genotype(1, 2), Genotype(1, 1)],
            &[Genotype(1, 2), Genotype(1, 1)],
        ], Pcrit::Value(0.0));
        // Locus 0: k = 1, locus 1 monomorphic: unused.
        assert_eq!(map.total_independent_alleles(), 1);
    }
}
