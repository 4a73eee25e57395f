//! Heterozygote-excess estimator: weighted mean excess D over retained
//! alleles of eligible loci, inverted to the effective number of breeders.

use crate::config::{EstimatorConfig, EPSILON};
use crate::result::{Ci, CiOutcome, NeEstimate};

use popgene::{EligibilityMap, PopulationSample};

use log::trace;

/// The heterozygote-excess estimate with its diagnostics, at one Pcrit.
#[derive(Debug, Clone)]
pub struct HetOutcome {
    pub estimate   : NeEstimate,
    /// Weighted mean heterozygote excess across loci.
    pub d_mean     : f64,
    pub std_error  : Option<f64>,
    pub loci_used  : usize,
    /// Σ K over used loci (the Student-t degrees of freedom).
    pub total_k    : f64,
}

/// One heterozygote-excess run over a single population sample at one Pcrit.
pub struct HetEngine<'a> {
    sample : &'a PopulationSample,
    elig   : &'a EligibilityMap,
    config : &'a EstimatorConfig,
}

impl<'a> HetEngine<'a> {
    #[must_use]
    pub fn new(sample: &'a PopulationSample, elig: &'a EligibilityMap, config: &'a EstimatorConfig) -> HetEngine<'a> {
        HetEngine { sample, elig, config }
    }

    pub fn run(&self) -> HetOutcome {
        let mut sum_w   = 0.0; // Σ W
        let mut sum_wd  = 0.0; // Σ W·D
        let mut sum_wd2 = 0.0; // Σ W·D²
        let mut sum_w2  = 0.0; // Σ W²/(K+1)
        let mut sum_k   = 0.0; // Σ K
        let mut loci_used = 0;

        for locus_index in self.elig.used_loci() {
            let Some((d_locus, k)) = self.locus_excess(locus_index) else { continue };
            let n = self.sample.locus(locus_index).n_scored() as f64;
            let w = n.sqrt() * k;

            sum_w   += w;
            sum_wd  += w * d_locus;
            sum_wd2 += w * d_locus * d_locus;
            sum_w2  += w * w / (k + 1.0);
            sum_k   += k;
            loci_used += 1;
            trace!("Locus {locus_index}: D = {d_locus:.6}, weight {w:.3}");
        }

        if loci_used == 0 || sum_w <= 0.0 {
            return HetOutcome {
                estimate  : NeEstimate::infinite(),
                d_mean    : 0.0,
                std_error : None,
                loci_used : 0,
                total_k   : 0.0,
            }
        }

        let d_mean = sum_wd / sum_w;
        let ne = nb_from_excess(d_mean);

        let std_error = Self::standard_error(sum_w, sum_wd2, sum_w2, sum_k, d_mean);
        let parametric = if self.config.parametric_ci {
            self.parametric_ci(d_mean, std_error, sum_k)
        } else {
            CiOutcome::NotRequested
        };

        // The heterozygote-excess CI is parametric-only; the jackknife slot
        // stays empty rather than pretending otherwise.
        let jackknife = if self.config.jackknife_ci {
            CiOutcome::skipped("not defined for this estimator")
        } else {
            CiOutcome::NotRequested
        };

        let mut estimate = NeEstimate { ne, parametric, jackknife };
        if self.config.merge_ci {
            estimate.merge_cis();
        }

        HetOutcome { estimate, d_mean, std_error, loci_used, total_k: sum_k }
    }

    // Per-locus mean excess over retained alleles, with dropped
    // low-frequency alleles lumped into one composite allele that counts as
    // retained. Returns (D, K).
    fn locus_excess(&self, locus_index: usize) -> Option<(f64, f64)> {
        let data = self.sample.locus(locus_index);
        let elig = self.elig.locus(locus_index);
        let n = data.n_scored();
        if n < 2 || elig.retained.is_empty() {
            return None
        }

        let mut sum_d = 0.0;
        let mut count = 0usize;
        for &rank in &elig.retained {
            let allele = &data.alleles()[rank];
            sum_d += allele_excess(allele.freq, allele.heterozygotes(), n);
            count += 1;
        }

        // Composite allele from everything the filter dropped.
        if elig.any_dropped {
            let (mut lumped_freq, mut lumped_hets) = (0.0, 0u32);
            for (rank, allele) in data.alleles().iter().enumerate() {
                if !elig.retained.contains(&rank) {
                    lumped_freq += allele.freq;
                    lumped_hets += allele.heterozygotes();
                }
            }
            if lumped_freq > 0.0 && lumped_freq < 1.0 {
                sum_d += allele_excess(lumped_freq, lumped_hets, n);
                count += 1;
            }
        }

        (count > 0).then(|| (sum_d / count as f64, f64::from(elig.k)))
    }

    // SE of the weighted mean D: the weighted between-locus variance scaled
    // by the total independent-allele count, with the finite-weight
    // correction (ΣW)²/((ΣW)² − ΣW²/(K+1)).
    fn standard_error(sum_w: f64, sum_wd2: f64, sum_w2: f64, sum_k: f64, d_mean: f64) -> Option<f64> {
        if sum_k < 1.0 {
            return None
        }
        let spread = (sum_wd2 / sum_w - d_mean * d_mean).max(0.0) / sum_k;
        let denom  = sum_w * sum_w - sum_w2;
        if denom <= 0.0 {
            return None
        }
        let variance = spread * (sum_w * sum_w) / denom;
        (variance > 0.0).then(|| variance.sqrt())
    }

    fn parametric_ci(&self, d_mean: f64, std_error: Option<f64>, sum_k: f64) -> CiOutcome {
        let Some(se) = std_error else {
            return CiOutcome::skipped("undefined standard error")
        };
        if sum_k < 1.0 {
            return CiOutcome::skipped("no independent alleles")
        }
        match numeric::student_t975(sum_k.round()) {
            Err(e) => CiOutcome::skipped(format!("t inversion failed: {e}")),
            Ok(t)  => {
                let (d_low, d_high) = (d_mean - t * se, d_mean + t * se);
                // Nb is decreasing in D over the useful range: bounds swap.
                CiOutcome::Estimated(Ci::new(nb_from_excess(d_high), nb_from_excess(d_low)))
            }
        }
    }
}

/// Per-allele heterozygote excess d = (O - E)/E, with the small-sample
/// Levene correction on the expectation.
#[must_use]
pub fn allele_excess(freq: f64, heterozygotes: u32, n_scored: usize) -> f64 {
    let n = n_scored as f64;
    let expected = 2.0 * freq * (1.0 - freq) * (1.0 + 1.0 / (2.0 * n - 1.0));
    if expected <= 0.0 {
        return 0.0
    }
    let observed = f64::from(heterozygotes) / n;
    (observed - expected) / expected
}

/// Zhdanova–Pudovkin inversion of the mean excess into Nb:
/// `Nb = 1/(2D) + 1/(2(D+1))`. |D| at or below ε maps to ∞.
#[must_use]
pub fn nb_from_excess(d: f64) -> Option<f64> {
    if d.abs() <= EPSILON || (d + 1.0).abs() <= EPSILON {
        return None
    }
    Some((2.0 * d + 1.0) / (2.0 * d * (d + 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use popgene::{Genotype, LocusSet, Pcrit};

    fn run_het(rows: &[Vec<Genotype>], pcrit: Pcrit) -> HetOutcome {
        let locus_count = rows[0].len();
        let loci = LocusSet::new((0..locus_count).map(|i| format!("L{i}")));
        let mut sample = PopulationSample::new("pop1", locus_count);
        for row in rows {
            sample.ingest(row).unwrap();
        }
        sample.finalize();
        let elig = EligibilityMap::build(&loci, &sample, pcrit);
        let config = EstimatorConfig::default();
        HetEngine::new(&sample, &elig, &config).run()
    }

    #[test]
    fn excess_at_hardy_weinberg_is_slightly_negative() {
        // 100 individuals, two alleles at 0.5, observed heterozygote
        // fraction exactly 0.5: the Levene-corrected expectation is
        // 0.5·(1 + 1/199), so d ≈ -1/200.
        let mut rows = Vec::new();
        for _ in 0..25 { rows.push(vec![Genotype(1, 1)]); }
        for _ in 0..50 { rows.push(vec![Genotype(1, 2)]); }
        for _ in 0..25 { rows.push(vec![Genotype(2, 2)]); }

        let outcome = run_het(&rows, Pcrit::Value(0.0));
        approx::assert_relative_eq!(outcome.d_mean, -1.0 / 200.0, max_relative = 1e-9);

        // Nb follows the closed-form map and is large in magnitude.
        let expected_nb = (2.0 * outcome.d_mean + 1.0) / (2.0 * outcome.d_mean * (outcome.d_mean + 1.0));
        let nb = outcome.estimate.ne.unwrap();
        approx::assert_relative_eq!(nb, expected_nb, max_relative = 1e-12);
        assert!(nb.abs() > 0.99 / (2.0 * outcome.d_mean.abs()));
    }

    #[test]
    fn true_excess_gives_positive_nb() {
        // Every individual heterozygous: O = 1 far above E = 0.5·(1+1/19).
        let rows: Vec<Vec<Genotype>> = (0..10).map(|_| vec![Genotype(1, 2)]).collect();
        let outcome = run_het(&rows, Pcrit::Value(0.0));
        assert!(outcome.d_mean > 0.0);
        let nb = outcome.estimate.ne.unwrap();
        assert!(nb > 0.0);
    }

    #[test]
    fn monomorphic_sample_is_infinite() {
        let rows: Vec<Vec<Genotype>> = (0..10).map(|_| vec![Genotype(1, 1), Genotype(1, 1)]).collect();
        let outcome = run_het(&rows, Pcrit::Value(0.0));
        assert_eq!(outcome.loci_used, 0);
        assert_eq!(outcome.estimate.ne, None);
    }

    #[test]
    fn lumped_alleles_enter_the_locus_mean() {
        // 10 individuals; allele 3 is a singleton at freq 0.05, dropped at
        // Pcrit 0.1 and folded into the composite term.
        let mut rows: Vec<Vec<Genotype>> = vec![vec![Genotype(1, 2)]; 9];
        rows.push(vec![Genotype(1, 3)]);

        let filtered = run_het(&rows, Pcrit::Value(0.1));
        let unfiltered = run_het(&rows, Pcrit::Value(0.0));
        assert_eq!(filtered.loci_used, 1);
        // Composite lumping reproduces the allele it lumped: identical mean.
        approx::assert_relative_eq!(filtered.d_mean, unfiltered.d_mean, max_relative = 1e-9);
        // But the independent-allele count differs (2 with drops vs 2 of 3).
        assert_eq!(filtered.total_k, 2.0);
        assert_eq!(unfiltered.total_k, 2.0);
    }

    #[test]
    fn nb_map_closed_form() {
        assert_eq!(nb_from_excess(0.0), None);
        approx::assert_relative_eq!(nb_from_excess(0.05).unwrap(), 1.0 / 0.1 + 1.0 / 2.1, max_relative = 1e-12);
        // Negative excess maps to a finite negative Nb.
        assert!(nb_from_excess(-0.005).unwrap() < 0.0);
    }
}
