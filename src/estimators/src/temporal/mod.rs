//! Temporal estimators: Pollak Fk, Nei/Tajima Fc and Jorde/Ryman Fs between
//! temporally spaced samples of one population, bias-corrected for sample
//! size and sampling plan, converted to Ne through the generation gap.

use crate::config::{EstimatorConfig, EPSILON};
use crate::result::{Ci, CiOutcome, NeEstimate};

use popgene::{LocusSet, Pcrit, TemporalSeries};

use log::debug;

mod fstats;
use fstats::{locus_fstats, LocusFStats};

/// The three F-statistic flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempFlavor {
    Pollak,
    NeiTajima,
    JordeRyman,
}

impl TempFlavor {
    pub const ALL: [TempFlavor; 3] = [TempFlavor::Pollak, TempFlavor::NeiTajima, TempFlavor::JordeRyman];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TempFlavor::Pollak     => "Pollak Fk",
            TempFlavor::NeiTajima  => "Nei/Tajima Fc",
            TempFlavor::JordeRyman => "Jorde/Ryman Fs",
        }
    }
}

/// One temporal estimate: a flavor applied to one ordered sample pair.
#[derive(Debug, Clone)]
pub struct TempOutcome {
    pub flavor         : TempFlavor,
    /// Indices of the two samples within the series.
    pub pair           : (usize, usize),
    pub gap            : f64,
    pub f_raw          : f64,
    pub f_prime        : f64,
    pub harmonic_genes : f64,
    pub loci_used      : usize,
    pub estimate       : NeEstimate,
}

impl TempOutcome {
    fn degenerate(flavor: TempFlavor, pair: (usize, usize), gap: f64, note: &str) -> TempOutcome {
        TempOutcome {
            flavor,
            pair,
            gap,
            f_raw          : 0.0,
            f_prime        : 0.0,
            harmonic_genes : 0.0,
            loci_used      : 0,
            estimate       : NeEstimate {
                ne         : None,
                parametric : CiOutcome::skipped(note),
                jackknife  : CiOutcome::skipped(note),
            },
        }
    }
}

/// One temporal run over a series, at one Pcrit: every ordered sample pair
/// under every flavor.
pub struct TempEngine<'a> {
    series : &'a TemporalSeries,
    loci   : &'a LocusSet,
    pcrit  : Pcrit,
    config : &'a EstimatorConfig,
}

impl<'a> TempEngine<'a> {
    #[must_use]
    pub fn new(series: &'a TemporalSeries, loci: &'a LocusSet, pcrit: Pcrit, config: &'a EstimatorConfig) -> TempEngine<'a> {
        TempEngine { series, loci, pcrit, config }
    }

    pub fn run(&self) -> Vec<TempOutcome> {
        let mut outcomes = Vec::new();
        for (a, b, gap) in self.series.sample_pairs() {
            outcomes.extend(self.run_pair(a, b, gap));
        }
        outcomes
    }

    fn run_pair(&self, a: usize, b: usize, gap: f64) -> Vec<TempOutcome> {
        let (sample_a, sample_b) = (self.series.sample(a), self.series.sample(b));
        let per_locus: Vec<LocusFStats> = self.loci.iter()
            .filter(|locus| !locus.is_dropped())
            .filter_map(|locus| locus_fstats(sample_a, sample_b, locus.index, self.pcrit))
            .collect();

        if per_locus.is_empty() {
            return TempFlavor::ALL
                .map(|flavor| TempOutcome::degenerate(flavor, (a, b), gap, "no usable loci"))
                .to_vec()
        }
        debug!("Temporal pair ({}, {}): {} usable loci, gap {gap}", sample_a.id(), sample_b.id(), per_locus.len());

        let has_missing = sample_a.has_missing() || sample_b.has_missing();
        let extra = self.series.plan().correction();

        TempFlavor::ALL
            .map(|flavor| self.run_flavor(flavor, &per_locus, (a, b), gap, has_missing, extra))
            .to_vec()
    }

    fn run_flavor(
        &self,
        flavor: TempFlavor,
        per_locus: &[LocusFStats],
        pair: (usize, usize),
        gap: f64,
        has_missing: bool,
        extra: f64,
    ) -> TempOutcome {
        let summary = match flavor {
            TempFlavor::JordeRyman => Self::jorde_ryman_summary(per_locus, None, extra),
            _ => Self::weighted_summary(flavor, per_locus, None, has_missing, extra, None),
        };
        let Some(mut summary) = summary else {
            return TempOutcome::degenerate(flavor, pair, gap, "no usable loci")
        };

        let mut ne = ne_from_f(summary.f_prime, gap);

        // Optional re-weighting of the Pollak flavor around the estimate.
        if flavor == TempFlavor::Pollak && has_missing && self.config.reweight_missing {
            for _ in 0..2 {
                let Some(ne_value) = ne else { break };
                let Some(next) = Self::weighted_summary(flavor, per_locus, None, has_missing, extra, Some(ne_value)) else { break };
                summary = next;
                ne = ne_from_f(summary.f_prime, gap);
            }
        }

        let parametric = if self.config.parametric_ci {
            Self::parametric_ci(&summary, gap)
        } else {
            CiOutcome::NotRequested
        };

        let jackknife = if !self.config.jackknife_ci {
            CiOutcome::NotRequested
        } else if per_locus.len() < 2 {
            CiOutcome::skipped("fewer than 2 usable loci")
        } else {
            Self::jackknife_ci(flavor, per_locus, &summary, gap, has_missing, extra)
        };

        let mut estimate = NeEstimate { ne, parametric, jackknife };
        if self.config.merge_ci {
            estimate.merge_cis();
        }

        TempOutcome {
            flavor,
            pair,
            gap,
            f_raw          : summary.f_raw,
            f_prime        : summary.f_prime,
            harmonic_genes : summary.harmonic_genes,
            loci_used      : per_locus.len(),
            estimate,
        }
    }

    // Weighted means across loci for the Pollak and Nei/Tajima flavors.
    // `reweight_around` switches the Pollak weights to n²/(3Ne + n)².
    fn weighted_summary(
        flavor: TempFlavor,
        per_locus: &[LocusFStats],
        exclude: Option<usize>,
        has_missing: bool,
        extra: f64,
        reweight_around: Option<f64>,
    ) -> Option<FlavorSummary> {
        let mut sum_w       = 0.0;
        let mut sum_w_raw   = 0.0;
        let mut sum_w_prime = 0.0;
        let mut sum_w_hbar  = 0.0;
        let mut sum_w_n     = 0.0;
        let mut df          = 0.0;

        for (index, locus) in per_locus.iter().enumerate() {
            if Some(index) == exclude {
                continue
            }
            let (f_locus, mut weight) = match flavor {
                TempFlavor::Pollak     => (locus.fk, locus.a - 1.0),
                TempFlavor::NeiTajima  => (locus.fc, locus.a),
                TempFlavor::JordeRyman => unreachable!("summed separately"),
            };
            if flavor == TempFlavor::Pollak {
                match reweight_around {
                    Some(ne) => {
                        let denom = 3.0 * ne + locus.harmonic_genes;
                        weight *= locus.harmonic_genes * locus.harmonic_genes / (denom * denom);
                    }
                    None if has_missing => {
                        weight *= locus.harmonic_genes * locus.harmonic_genes;
                    }
                    None => {}
                }
            }
            sum_w       += weight;
            sum_w_raw   += weight * f_locus;
            sum_w_prime += weight * (f_locus - locus.hbar + extra);
            sum_w_hbar  += weight * locus.hbar;
            sum_w_n     += weight / locus.harmonic_genes;
            df          += locus.a - 1.0;
        }
        if sum_w <= 0.0 {
            return None
        }
        Some(FlavorSummary {
            f_raw          : sum_w_raw / sum_w,
            f_prime        : sum_w_prime / sum_w,
            mean_hbar      : sum_w_hbar / sum_w,
            harmonic_genes : sum_w / sum_w_n,
            df,
            extra,
            jorde_ryman    : None,
        })
    }

    // The Jorde/Ryman flavor keeps numerator and denominator sums across
    // loci, then applies the ratio correction once.
    fn jorde_ryman_summary(per_locus: &[LocusFStats], exclude: Option<usize>, extra: f64) -> Option<FlavorSummary> {
        let mut num = 0.0;
        let mut den = 0.0;
        let mut genes_a = Vec::with_capacity(per_locus.len());
        let mut genes_b = Vec::with_capacity(per_locus.len());
        let mut df = 0.0;
        for (index, locus) in per_locus.iter().enumerate() {
            if Some(index) == exclude {
                continue
            }
            num += locus.fs_num;
            den += locus.fs_den;
            genes_a.push(locus.genes_a);
            genes_b.push(locus.genes_b);
            df += locus.a - 1.0;
        }
        if den <= 0.0 {
            return None
        }
        let fs = num / den;
        let harm_a = numeric::harmonic_mean(&genes_a)?;
        let harm_b = numeric::harmonic_mean(&genes_b)?;
        let hbar   = 1.0 / harm_a + 1.0 / harm_b;
        let inv2   = 1.0 / (2.0 * harm_b);
        Some(FlavorSummary {
            f_raw          : fs,
            f_prime        : jorde_ryman_prime(fs, hbar, inv2, extra),
            mean_hbar      : hbar,
            harmonic_genes : 2.0 / hbar,
            df,
            extra,
            jorde_ryman    : Some(inv2),
        })
    }

    fn parametric_ci(summary: &FlavorSummary, gap: f64) -> CiOutcome {
        if summary.df < 1.0 {
            return CiOutcome::skipped("no independent alleles")
        }
        match numeric::chi2_ci(summary.f_raw, summary.df.round()) {
            Err(e) => CiOutcome::skipped(format!("chi-square inversion failed: {e}")),
            Ok((f_low, f_high)) => {
                let prime = |f: f64| summary.correct(f);
                // Lower F means larger Ne: bounds swap through inversion.
                CiOutcome::Estimated(Ci::new(
                    ne_from_f(prime(f_high), gap),
                    ne_from_f(prime(f_low), gap),
                ))
            }
        }
    }

    fn jackknife_ci(
        flavor: TempFlavor,
        per_locus: &[LocusFStats],
        summary: &FlavorSummary,
        gap: f64,
        has_missing: bool,
        extra: f64,
    ) -> CiOutcome {
        let leave_one_out: Vec<f64> = (0..per_locus.len())
            .filter_map(|index| {
                let excluded = match flavor {
                    TempFlavor::JordeRyman => Self::jorde_ryman_summary(per_locus, Some(index), extra),
                    _ => Self::weighted_summary(flavor, per_locus, Some(index), has_missing, extra, None),
                };
                excluded.map(|s| s.f_prime)
            })
            .collect();

        let Some(variance) = numeric::jackknife_variance(&leave_one_out) else {
            return CiOutcome::skipped("degenerate leave-one-out set")
        };
        let Some(df) = numeric::jackknife_df(summary.f_prime, variance) else {
            return CiOutcome::skipped("zero jackknife variance")
        };
        match numeric::chi2_ci(summary.f_prime, df) {
            Err(e) => CiOutcome::skipped(format!("chi-square inversion failed: {e}")),
            Ok((f_low, f_high)) => {
                CiOutcome::Estimated(Ci::new(ne_from_f(f_high, gap), ne_from_f(f_low, gap)))
            }
        }
    }
}

// Aggregate of one flavor over one sample pair.
struct FlavorSummary {
    f_raw          : f64,
    f_prime        : f64,
    mean_hbar      : f64,
    harmonic_genes : f64,
    df             : f64,
    extra          : f64,
    /// `Some(inv2)` marks the Jorde/Ryman ratio correction.
    jorde_ryman    : Option<f64>,
}

impl FlavorSummary {
    // Map a raw F value onto the bias-corrected scale this summary uses.
    fn correct(&self, f: f64) -> f64 {
        match self.jorde_ryman {
            Some(inv2) => jorde_ryman_prime(f, self.mean_hbar, inv2, self.extra),
            None       => f - self.mean_hbar + self.extra,
        }
    }
}

/// Jorde/Ryman bias correction of the pooled Fs ratio.
fn jorde_ryman_prime(fs: f64, hbar: f64, inv2: f64, extra: f64) -> f64 {
    let numerator   = fs * (1.0 - hbar / 4.0 + extra / 4.0) - hbar + extra;
    let denominator = (1.0 + fs / 4.0) * (1.0 - inv2);
    if denominator.abs() <= EPSILON {
        return 0.0
    }
    numerator / denominator
}

/// Ne from a bias-corrected F: `Ne = T/(2F′)`, infinite at or below ε.
#[must_use]
pub fn ne_from_f(f_prime: f64, gap: f64) -> Option<f64> {
    (f_prime > EPSILON).then(|| gap / (2.0 * f_prime))
}
