//! Molecular-coancestry estimator: putative non-sib pair selection, weighted
//! coancestry average and inversion to the effective number of breeders,
//! with a jackknife-over-loci confidence interval.

use crate::config::{EstimatorConfig, EPSILON};
use crate::result::{Ci, CiOutcome, NeEstimate};

use popgene::{LocusSet, PopulationSample};

use log::{debug, trace};

/// The coancestry estimate with its diagnostics. Unlike the other
/// single-sample engines, this one ignores the critical-frequency filter and
/// runs once per population.
#[derive(Debug, Clone)]
pub struct CoanOutcome {
    pub estimate     : NeEstimate,
    /// Weighted mean coancestry difference f₁.
    pub f1           : f64,
    pub nonsib_pairs : usize,
    pub loci_used    : usize,
}

// Per-locus ingredients of the weighted mean.
struct LocusCoancestry {
    sp        : f64, // mean similarity of putative non-sibs
    fmp       : f64, // mean molecular coancestry over all pairs
    weight    : f64, // (1 - sp)² / (1 - Σq²)
}

/// One coancestry run over a single population sample.
pub struct CoanEngine<'a> {
    sample : &'a PopulationSample,
    loci   : &'a LocusSet,
    config : &'a EstimatorConfig,
}

impl<'a> CoanEngine<'a> {
    #[must_use]
    pub fn new(sample: &'a PopulationSample, loci: &'a LocusSet, config: &'a EstimatorConfig) -> CoanEngine<'a> {
        CoanEngine { sample, loci, config }
    }

    pub fn run(&self) -> CoanOutcome {
        let pairs = self.select_nonsib_pairs();
        debug!("Population {}: {} putative non-sib pairs", self.sample.id(), pairs.len());

        let per_locus = self.locus_measures(&pairs);
        if per_locus.is_empty() {
            return CoanOutcome {
                estimate     : NeEstimate::infinite(),
                f1           : 0.0,
                nonsib_pairs : pairs.len(),
                loci_used    : 0,
            }
        }

        let f1 = Self::weighted_f1(&per_locus, None);
        let ne = nb_from_coancestry(f1);

        // The parametric flavor has no derivation here: χ² intervals come
        // from the jackknife df below.
        let parametric = if self.config.parametric_ci {
            CiOutcome::skipped("not defined for this estimator")
        } else {
            CiOutcome::NotRequested
        };

        let jackknife = if !self.config.jackknife_ci {
            CiOutcome::NotRequested
        } else if per_locus.len() < 2 {
            CiOutcome::skipped("fewer than 2 polymorphic loci")
        } else {
            Self::jackknife_ci(&per_locus, f1)
        };

        let mut estimate = NeEstimate { ne, parametric, jackknife };
        if self.config.merge_ci {
            estimate.merge_cis();
        }

        CoanOutcome { estimate, f1, nonsib_pairs: pairs.len(), loci_used: per_locus.len() }
    }

    // Putative non-sib selection. Individuals are visited in scored order;
    // each picks the so-far-unpaired partner minimising mean similarity over
    // loci with data for both, with tolerance 1/(4L²). A pair is stored only
    // when the chosen partner has a higher index; pairs whose second member
    // is the just-processed individual are purged from the working list once
    // it completes (they can never match a later exclusion lookup).
    fn select_nonsib_pairs(&self) -> Vec<(usize, usize)> {
        let n = self.sample.n();
        let locus_count = self.loci.len() as f64;
        let tolerance = 1.0 / (4.0 * locus_count * locus_count);

        let mut reference: Vec<(usize, usize)> = Vec::new();
        let mut selected:  Vec<(usize, usize)> = Vec::new();

        for i in 0..n {
            let mut best: Option<(usize, f64)> = None;
            for j in 0..n {
                if j == i || reference.iter().any(|&(a, b)| (a, b) == (j, i) || (a, b) == (i, j)) {
                    continue
                }
                let Some(similarity) = self.mean_similarity(i, j) else { continue };
                let improves = match best {
                    None                => true,
                    Some((_, current))  => similarity < current - tolerance,
                };
                if improves {
                    best = Some((j, similarity));
                }
            }
            if let Some((j, similarity)) = best {
                trace!("Individual {i}: putative non-sib {j} (mean similarity {similarity:.4})");
                if j > i {
                    reference.push((i, j));
                    selected.push((i, j));
                }
            }
            reference.retain(|&(_, second)| second != i);
        }
        selected
    }

    // Mean similarity score of two individuals over loci scored in both.
    fn mean_similarity(&self, i: usize, j: usize) -> Option<f64> {
        let mut total = 0u32;
        let mut counted = 0u32;
        for locus in self.loci.iter().filter(|l| !l.is_dropped()) {
            let genotypes = self.sample.locus(locus.index).genotypes();
            let (a, b) = (genotypes[i], genotypes[j]);
            if a.is_missing() || b.is_missing() {
                continue
            }
            total += a.similarity(&b);
            counted += 1;
        }
        (counted > 0).then(|| f64::from(total) / f64::from(counted))
    }

    // Per-locus similarity of non-sibs, coancestry over all pairs, and the
    // (1 - sp)²/(1 - Σq²) weight. Monomorphic loci carry no information and
    // are left out.
    fn locus_measures(&self, pairs: &[(usize, usize)]) -> Vec<LocusCoancestry> {
        let n = self.sample.n();
        let mut measures = Vec::new();

        for locus in self.loci.iter().filter(|l| !l.is_dropped()) {
            let data = self.sample.locus(locus.index);
            let sum_sq: f64 = data.alleles().iter().map(|a| a.freq * a.freq).sum();
            if 1.0 - sum_sq <= EPSILON {
                continue // monomorphic
            }
            let genotypes = data.genotypes();

            // Mean similarity of the putative non-sib pairs.
            if pairs.is_empty() {
                continue
            }
            let mut nonsib_total = 0u32;
            for &(i, j) in pairs {
                let (a, b) = (genotypes[i], genotypes[j]);
                if a.is_missing() || b.is_missing() {
                    continue
                }
                nonsib_total += a.similarity(&b);
            }
            let sp = f64::from(nonsib_total) / (2.0 * pairs.len() as f64);

            // Molecular coancestry over every unordered pair with data.
            let mut all_total = 0u32;
            let mut all_pairs = 0u32;
            for i in 0..n {
                if genotypes[i].is_missing() {
                    continue
                }
                for j in (i + 1)..n {
                    if genotypes[j].is_missing() {
                        continue
                    }
                    all_total += genotypes[i].similarity(&genotypes[j]);
                    all_pairs += 1;
                }
            }
            if all_pairs == 0 {
                continue
            }
            let fmp = f64::from(all_total) / (4.0 * f64::from(all_pairs));

            let weight = (1.0 - sp) * (1.0 - sp) / (1.0 - sum_sq);
            measures.push(LocusCoancestry { sp, fmp, weight });
        }
        measures
    }

    // Weighted mean f₁ = Σ w (f_m - sp) / Σ w, optionally excluding one
    // locus (the jackknife delete).
    fn weighted_f1(per_locus: &[LocusCoancestry], exclude: Option<usize>) -> f64 {
        let mut sum_w  = 0.0;
        let mut sum_wf = 0.0;
        for (index, locus) in per_locus.iter().enumerate() {
            if Some(index) == exclude {
                continue
            }
            sum_w  += locus.weight;
            sum_wf += locus.weight * (locus.fmp - locus.sp);
        }
        if sum_w <= 0.0 { 0.0 } else { sum_wf / sum_w }
    }

    fn jackknife_ci(per_locus: &[LocusCoancestry], f1: f64) -> CiOutcome {
        let leave_one_out: Vec<f64> = (0..per_locus.len())
            .map(|index| Self::weighted_f1(per_locus, Some(index)))
            .collect();

        let Some(variance) = numeric::jackknife_variance(&leave_one_out) else {
            return CiOutcome::skipped("degenerate leave-one-out set")
        };
        let Some(df) = numeric::jackknife_df(f1, variance) else {
            return CiOutcome::skipped("zero jackknife variance")
        };
        match numeric::chi2_ci(f1, df) {
            Err(e) => CiOutcome::skipped(format!("chi-square inversion failed: {e}")),
            Ok((f_low, f_high)) => {
                // Nb = 1/(2f): a larger coancestry means a smaller Nb.
                CiOutcome::Estimated(Ci::new(nb_from_coancestry(f_high), nb_from_coancestry(f_low)))
            }
        }
    }
}

/// Nb from the weighted mean coancestry difference: `Nb = 1/(2f₁)`, infinite
/// at or below ε.
#[must_use]
pub fn nb_from_coancestry(f1: f64) -> Option<f64> {
    (f1 > EPSILON).then(|| 1.0 / (2.0 * f1))
}
