//! Linkage-disequilibrium estimator: Burrows composite r² over locus pairs,
//! sampling-bias correction and inversion to Ne, with parametric and
//! jackknife-over-individuals confidence intervals.

use crate::config::{ChromosomeGrouping, EstimatorConfig, EPSILON};
use crate::result::{Ci, CiOutcome, NeEstimate};
use crate::EstimatorError;

use popgene::{EligibilityMap, LocusSet, PopulationSample};

use anyhow::Result;
use itertools::Itertools;
use log::{debug, trace};
use logger::Logger;

mod burrows;
pub use burrows::{expected_r2, invert_ne};
use burrows::{BurrowsCalculator, JackknifeDeltas};

mod pairs;
pub use pairs::PairRecord;
use pairs::{FinishedPairStore, PairStore};

/// Empirical correction applied to the jackknife variance of the weighted
/// mean r². Carried from the source calibration; not derived in-situ.
const JACKKNIFE_VARIANCE_FACTOR: f64 = 0.84 * 0.84;

/// The LD estimate with its run diagnostics, at one Pcrit.
#[derive(Debug, Clone)]
pub struct LdOutcome {
    pub estimate                : NeEstimate,
    /// Weighted harmonic mean of per-pair sample sizes.
    pub harmonic_n              : Option<f64>,
    pub mean_r2                 : f64,
    pub expected_r2             : f64,
    pub r2_drift                : f64,
    /// Σ K(p)·K(q): independent allele comparisons, the parametric χ² df.
    pub independent_comparisons : f64,
    pub pairs_used              : usize,
    /// Per-pair records, kept only when the pair dump was requested.
    pub pair_records            : Vec<PairRecord>,
}

impl LdOutcome {
    fn degenerate(note: &str) -> LdOutcome {
        LdOutcome {
            estimate: NeEstimate {
                ne         : None,
                parametric : CiOutcome::skipped(note),
                jackknife  : CiOutcome::skipped(note),
            },
            harmonic_n              : None,
            mean_r2                 : 0.0,
            expected_r2             : 0.0,
            r2_drift                : 0.0,
            independent_comparisons : 0.0,
            pairs_used              : 0,
            pair_records            : Vec::new(),
        }
    }
}

/// One LD estimation run over a single population sample at one Pcrit.
pub struct LdEngine<'a> {
    sample : &'a PopulationSample,
    loci   : &'a LocusSet,
    elig   : &'a EligibilityMap,
    config : &'a EstimatorConfig,
}

impl<'a> LdEngine<'a> {
    #[must_use]
    pub fn new(
        sample: &'a PopulationSample,
        loci: &'a LocusSet,
        elig: &'a EligibilityMap,
        config: &'a EstimatorConfig,
    ) -> LdEngine<'a> {
        LdEngine { sample, loci, elig, config }
    }

    pub fn run(&self) -> Result<LdOutcome> {
        let used: Vec<usize> = self.elig.used_loci().collect();
        if used.len() < 2 {
            return Ok(LdOutcome::degenerate("no locus pairs"))
        }
        self.check_grouping(&used)?;

        let n = self.sample.n();
        let has_missing = self.sample.has_missing();
        let jackknife_wanted = self.config.jackknife_ci && n >= 3;

        // ---- Burrows pass over every eligible pair.
        let mut calc   = BurrowsCalculator::new(self.sample, self.elig);
        let mut deltas = jackknife_wanted.then(|| JackknifeDeltas::new(n));
        let mut store  = PairStore::new(self.config.spill_threshold, self.sample.id());
        let mut independent = 0.0;

        let candidates = used.len() * (used.len() - 1) / 2;
        let bar = Logger::progress_bar(candidates as u64, format!("LD pairs [{}]", self.sample.id()));

        for (&p, &q) in used.iter().tuple_combinations() {
            bar.inc(1);
            if !self.pair_allowed(p, q) {
                continue
            }
            let Some(stats) = calc.pair(p, q, deltas.as_mut()) else {
                trace!("Locus pair ({p}, {q}) skipped: fewer than 2 joint individuals or no allele pairs");
                continue
            };
            let weight_base = f64::from(self.elig.locus(p).k) * f64::from(self.elig.locus(q).k);
            independent += weight_base;
            store.push(PairRecord {
                p           : p as u32,
                q           : q as u32,
                n           : stats.n,
                weight_base,
                r2          : stats.r2,
                exp_r2      : expected_r2(f64::from(stats.n)),
            })?;
        }
        bar.finish_and_clear();

        let store = store.finish()?;
        if store.is_empty() {
            return Ok(LdOutcome::degenerate("no locus pairs"))
        }
        debug!("Population {}: {} locus pairs retained, {:.0} independent comparisons",
               self.sample.id(), store.len(), independent);

        // ---- Weighted means under the base weighting scheme.
        let (mut mean_r2, mut mean_exp, mut harmonic_n, total_w, total_wr2) =
            Self::weighted_means(&store, |rec| rec.weight(has_missing));
        let base_mean_r2  = mean_r2;
        let base_mean_exp = mean_exp;
        let base_harmonic = harmonic_n;

        let mut ne = invert_ne(mean_r2 - mean_exp, harmonic_n, self.config.mating);

        // ---- Optional sample-size re-weighting around the estimate.
        if has_missing && self.config.reweight_missing {
            for _ in 0..2 {
                let Some(ne_value) = ne else { break };
                let (r2, exp, s, _, _) = Self::weighted_means(&store, |rec| {
                    let n_pair = f64::from(rec.n);
                    rec.weight_base * n_pair * n_pair / ((3.0 * ne_value + n_pair) * (3.0 * ne_value + n_pair))
                });
                (mean_r2, mean_exp, harmonic_n) = (r2, exp, s);
                ne = invert_ne(mean_r2 - mean_exp, harmonic_n, self.config.mating);
            }
        }

        // ---- Parametric CI: the independent-comparison count as χ² df.
        let parametric = if self.config.parametric_ci {
            self.parametric_ci(mean_r2, mean_exp, harmonic_n, independent)
        } else {
            CiOutcome::NotRequested
        };

        // ---- Jackknife over individuals, on the base weighting scheme.
        let jackknife = if !self.config.jackknife_ci {
            CiOutcome::NotRequested
        } else if n < 3 {
            CiOutcome::skipped("fewer than 3 individuals")
        } else {
            self.jackknife_ci(
                deltas.as_ref().expect("deltas allocated when jackknife runs"),
                total_w, total_wr2,
                base_mean_r2, base_mean_exp, base_harmonic,
            )
        };

        let mut estimate = NeEstimate { ne, parametric, jackknife };
        if self.config.merge_ci {
            estimate.merge_cis();
        }

        let pair_records = if self.config.record_pairs {
            store.iter().collect()
        } else {
            Vec::new()
        };

        Ok(LdOutcome {
            estimate,
            harmonic_n              : Some(harmonic_n),
            mean_r2,
            expected_r2             : mean_exp,
            r2_drift                : mean_r2 - mean_exp,
            independent_comparisons : independent,
            pairs_used              : store.len(),
            pair_records,
        })
    }

    // Weighted means of r² and E[r²|n] plus the weighted harmonic mean of
    // pair sample sizes, under an arbitrary weighting scheme.
    fn weighted_means(
        store: &FinishedPairStore,
        weight_of: impl Fn(&PairRecord) -> f64,
    ) -> (f64, f64, f64, f64, f64) {
        let mut sum_w     = 0.0;
        let mut sum_wr2   = 0.0;
        let mut sum_wexp  = 0.0;
        let mut sum_w_n   = 0.0;
        for rec in store.iter() {
            let w = weight_of(&rec);
            if w <= 0.0 {
                continue
            }
            sum_w    += w;
            sum_wr2  += w * rec.r2;
            sum_wexp += w * rec.exp_r2;
            sum_w_n  += w / f64::from(rec.n);
        }
        if sum_w <= 0.0 {
            return (0.0, 0.0, 0.0, 0.0, 0.0)
        }
        (sum_wr2 / sum_w, sum_wexp / sum_w, sum_w / sum_w_n, sum_w, sum_wr2)
    }

    fn parametric_ci(&self, mean_r2: f64, mean_exp: f64, harmonic_n: f64, independent: f64) -> CiOutcome {
        if independent < 1.0 {
            return CiOutcome::skipped("no independent comparisons")
        }
        let df = independent.round();
        match numeric::chi2_ci(mean_r2, df) {
            Err(e) => CiOutcome::skipped(format!("chi-square inversion failed: {e}")),
            Ok((r2_low, r2_high)) => {
                // Lower r² maps to larger Ne: bounds swap through inversion.
                let ne_low  = invert_ne(r2_high - mean_exp, harmonic_n, self.config.mating);
                let ne_high = invert_ne(r2_low - mean_exp, harmonic_n, self.config.mating);
                CiOutcome::Estimated(Ci::new(ne_low, ne_high))
            }
        }
    }

    fn jackknife_ci(
        &self,
        deltas: &JackknifeDeltas,
        total_w: f64, total_wr2: f64,
        mean_r2: f64, mean_exp: f64, harmonic_n: f64,
    ) -> CiOutcome {
        let leave_one_out: Vec<f64> = (0..self.sample.n())
            .filter_map(|k| {
                let w = total_w + deltas.delta_w[k];
                (w > EPSILON).then(|| (total_wr2 + deltas.delta_wr2[k]) / w)
            })
            .collect();

        let Some(variance) = numeric::jackknife_variance(&leave_one_out) else {
            return CiOutcome::skipped("degenerate leave-one-out set")
        };
        let variance = variance * JACKKNIFE_VARIANCE_FACTOR;
        let Some(df) = numeric::jackknife_df(mean_r2, variance) else {
            return CiOutcome::skipped("zero jackknife variance")
        };
        match numeric::chi2_ci(mean_r2, df) {
            Err(e) => CiOutcome::skipped(format!("chi-square inversion failed: {e}")),
            Ok((r2_low, r2_high)) => {
                let ne_low  = invert_ne(r2_high - mean_exp, harmonic_n, self.config.mating);
                let ne_high = invert_ne(r2_low - mean_exp, harmonic_n, self.config.mating);
                CiOutcome::Estimated(Ci::new(ne_low, ne_high))
            }
        }
    }

    fn pair_allowed(&self, p: usize, q: usize) -> bool {
        let (chr_p, chr_q) = (self.loci.get()[p].chromosome, self.loci.get()[q].chromosome);
        match self.config.grouping {
            ChromosomeGrouping::All     => true,
            ChromosomeGrouping::Within  => matches!((chr_p, chr_q), (Some(a), Some(b)) if a == b),
            ChromosomeGrouping::Between => matches!((chr_p, chr_q), (Some(a), Some(b)) if a != b),
        }
    }

    fn check_grouping(&self, used: &[usize]) -> Result<()> {
        if self.config.grouping == ChromosomeGrouping::All {
            return Ok(())
        }
        let any_mapped = used.iter().any(|&l| self.loci.get()[l].chromosome.is_some());
        if any_mapped {
            Ok(())
        } else {
            Err(EstimatorError::MissingChromosomeMap.into())
        }
    }

}
