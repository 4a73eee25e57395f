use crate::{Allele, Genotype, PopgeneError};

use std::fmt::{self, Display, Formatter};

use anyhow::Result;
use log::trace;

/// Per-locus slice of a population sample's allele index.
///
/// - `alleles`   : unique alleles, ascending mobility. Owned exclusively by
///                 the sample; eligibility maps refer to them by rank.
/// - `genotypes` : one genotype per ingested individual, in input order. The
///                 i-th entry of every locus refers to the same individual.
/// - `missing`   : number of individuals with no data at this locus.
#[derive(Debug, Clone, Default)]
pub struct LocusData {
    alleles   : Vec<Allele>,
    genotypes : Vec<Genotype>,
    missing   : u32,
    min_freq  : f64,
    max_freq  : f64,
}

impl LocusData {
    /// Individuals scored (non-missing) at this locus.
    #[must_use]
    pub fn n_scored(&self) -> usize {
        self.genotypes.len() - self.missing as usize
    }

    #[must_use]
    pub fn missing(&self) -> u32 {
        self.missing
    }

    #[must_use]
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    #[must_use]
    pub fn genotypes(&self) -> &[Genotype] {
        &self.genotypes
    }

    #[must_use]
    pub fn min_freq(&self) -> f64 {
        self.min_freq
    }

    #[must_use]
    pub fn max_freq(&self) -> f64 {
        self.max_freq
    }

    /// Rank of the allele carrying `mobility`, if present.
    #[must_use]
    pub fn rank_of(&self, mobility: u32) -> Option<usize> {
        self.alleles.binary_search_by_key(&mobility, |a| a.mobility).ok()
    }

    // Locate-or-insert preserving ascending mobility order, then bump the
    // copy count by `copies` (1 or 2) and the homozygote count when needed.
    fn record_allele(&mut self, mobility: u32, copies: u32, homozygote: bool) {
        let rank = match self.alleles.binary_search_by_key(&mobility, |a| a.mobility) {
            Ok(rank)  => rank,
            Err(rank) => {
                self.alleles.insert(rank, Allele::new(mobility));
                rank
            }
        };
        self.alleles[rank].copies += copies;
        if homozygote {
            self.alleles[rank].homozygotes += 1;
        }
    }

    fn ingest(&mut self, genotype: Genotype) {
        self.genotypes.push(genotype);
        if genotype.is_missing() {
            self.missing += 1;
            return
        }
        if genotype.is_homozygote() {
            self.record_allele(genotype.0, 2, true);
        } else {
            self.record_allele(genotype.0, 1, false);
            self.record_allele(genotype.1, 1, false);
        }
    }

    fn finalize(&mut self) {
        let n_scored = self.n_scored();
        let genes    = 2 * n_scored as u32;
        (self.min_freq, self.max_freq) = (1.0, 0.0);
        for allele in &mut self.alleles {
            allele.freq = if genes == 0 { 0.0 } else { f64::from(allele.copies) / f64::from(genes) };
            self.min_freq = self.min_freq.min(allele.freq);
            self.max_freq = self.max_freq.max(allele.freq);
        }
        if self.alleles.is_empty() {
            (self.min_freq, self.max_freq) = (0.0, 0.0);
        }
    }
}

/// One population sample: the allele index over every locus, built
/// incrementally from individuals in input order.
///
/// Usage: `ingest()` once per individual, then `finalize()` before handing
/// the sample to any estimator.
#[derive(Debug, Clone)]
pub struct PopulationSample {
    id          : String,
    loci        : Vec<LocusData>,
    n           : usize,
    has_missing : bool,
}

impl PopulationSample {
    #[must_use]
    pub fn new(id: impl Into<String>, locus_count: usize) -> PopulationSample {
        PopulationSample {
            id          : id.into(),
            loci        : vec![LocusData::default(); locus_count],
            n           : 0,
            has_missing : false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of ingested individuals.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn locus_count(&self) -> usize {
        self.loci.len()
    }

    /// True iff any locus has any missing genotype. Toggles the estimators'
    /// sample-size weighting and per-pair frequency re-computation.
    #[must_use]
    pub fn has_missing(&self) -> bool {
        self.has_missing
    }

    #[must_use]
    pub fn locus(&self, index: usize) -> &LocusData {
        &self.loci[index]
    }

    #[must_use]
    pub fn loci(&self) -> &[LocusData] {
        &self.loci
    }

    /// Append one individual, given its genotype at every locus.
    ///
    /// # Errors
    /// - `LocusCountMismatch` when `genotypes` does not cover every locus.
    /// - `HalfMissing` when a genotype mixes a scored and a missing allele.
    pub fn ingest(&mut self, genotypes: &[Genotype]) -> Result<(), PopgeneError> {
        if genotypes.len() != self.loci.len() {
            return Err(PopgeneError::LocusCountMismatch { expected: self.loci.len(), found: genotypes.len() })
        }
        for genotype in genotypes {
            if (genotype.0 == 0) != (genotype.1 == 0) {
                return Err(PopgeneError::HalfMissing(genotype.0, genotype.1));
            }
        }
        for (locus, genotype) in self.loci.iter_mut().zip(genotypes) {
            locus.ingest(*genotype);
        }
        self.n += 1;
        Ok(())
    }

    /// Freeze the index: compute allele frequencies and per-locus frequency
    /// bounds, and set the missing-data flag.
    pub fn finalize(&mut self) {
        for locus in &mut self.loci {
            locus.finalize();
        }
        self.has_missing = self.loci.iter().any(|l| l.missing > 0);
        trace!("Finalized sample {}: {} individuals, {} loci, missing data: {}",
               self.id, self.n, self.loci.len(), self.has_missing);
    }
}

impl Display for PopulationSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{: <12} - {: <5} - {: <5}", self.id, self.n, self.loci.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_two_loci() -> PopulationSample {
        let mut sample = PopulationSample::new("pop1", 2);
        sample.ingest(&[Genotype(1, 1), Genotype(2, 3)]).unwrap();
        sample.ingest(&[Genotype(1, 2), Genotype(3, 3)]).unwrap();
        sample.ingest(&[Genotype(2, 2), Genotype::MISSING]).unwrap();
        sample.finalize();
        sample
    }

    #[test]
    fn allele_ordering_and_counts() {
        let sample = sample_two_loci();
        let locus0 = sample.locus(0);

        let mobilities: Vec<u32> = locus0.alleles().iter().map(|a| a.mobility).collect();
        assert_eq!(mobilities, vec![1, 2]);

        // Allele 1: hom in ind0 (2 copies) + het in ind1 (1 copy).
        assert_eq!(locus0.alleles()[0].copies, 3);
        assert_eq!(locus0.alleles()[0].homozygotes, 1);
        // Allele 2: het in ind1 + hom in ind2.
        assert_eq!(locus0.alleles()[1].copies, 3);
        assert_eq!(locus0.alleles()[1].homozygotes, 1);
    }

    #[test]
    fn frequencies_sum_to_one() {
        let sample = sample_two_loci();
        for locus in sample.loci() {
            if locus.n_scored() == 0 {
                continue
            }
            let total: f64 = locus.alleles().iter().map(|a| a.freq).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn copy_count_identity() {
        // copies == 2 * n_scored * freq, as an exact integer identity.
        let sample = sample_two_loci();
        for locus in sample.loci() {
            for allele in locus.alleles() {
                let reconstructed = (2.0 * locus.n_scored() as f64 * allele.freq).round() as u32;
                assert_eq!(allele.copies, reconstructed);
            }
        }
    }

    #[test]
    fn missing_bookkeeping() {
        let sample = sample_two_loci();
        assert!(sample.has_missing());
        assert_eq!(sample.locus(0).missing(), 0);
        assert_eq!(sample.locus(1).missing(), 1);
        assert_eq!(sample.locus(1).n_scored(), 2);
    }

    #[test]
    fn half_missing_is_rejected() {
        let mut sample = PopulationSample::new("pop1", 1);
        assert!(sample.ingest(&[Genotype(0, 2)]).is_err());
        assert!(sample.ingest(&[Genotype(2, 0)]).is_err());
    }

    #[test]
    fn locus_count_mismatch_is_rejected() {
        let mut sample = PopulationSample::new("pop1", 2);
        assert!(sample.ingest(&[Genotype(1, 1)]).is_err());
    }

    #[test]
    fn min_max_freq_cached() {
        let sample = sample_two_loci();
        let locus1 = sample.locus(1);
        // Locus 1 over 2 scored individuals: allele 2 (1 copy), allele 3 (3 copies).
        assert_relative_eq!(locus1.min_freq(), 0.25);
        assert_relative_eq!(locus1.max_freq(), 0.75);
    }
}
