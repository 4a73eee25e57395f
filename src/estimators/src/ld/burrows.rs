use crate::config::{MatingModel, EPSILON};

use popgene::{EligibilityMap, PopulationSample};

/// Expected r² of a drift-free sample of size `s` (Waples's small-sample
/// calibration). Strictly decreasing in `s`.
#[must_use]
pub fn expected_r2(s: f64) -> f64 {
    if s >= 30.0 {
        1.0 / s + 3.19 / (s * s)
    } else {
        0.0018 + 0.907 / s + 4.44 / (s * s)
    }
}

/// Invert the drift component of r² into Ne.
///
/// Solves `r = a/N - b/N²` for N, with calibrated coefficients chosen by the
/// mating model and the harmonic-mean sample size branch. The discriminant is
/// clamped at zero; a non-positive drift yields `None` (infinite Ne).
#[must_use]
pub fn invert_ne(r2_drift: f64, harmonic_s: f64, mating: MatingModel) -> Option<f64> {
    if r2_drift <= EPSILON {
        return None
    }
    let (a, four_b) = match (mating, harmonic_s >= 30.0) {
        (MatingModel::Random,   true)  => (1.0 / 3.0, 2.76),
        (MatingModel::Random,   false) => (0.308,     2.08),
        (MatingModel::Monogamy, true)  => (2.0 / 3.0, 7.2),
        (MatingModel::Monogamy, false) => (0.618,     5.24),
    };
    let disc = (a * a - four_b * r2_drift).max(0.0);
    Some((a + disc.sqrt()) / (2.0 * r2_drift))
}

/// Full-sample result of the Burrows pass over one locus pair.
pub(crate) struct PairStats {
    pub n  : u32,
    pub r2 : f64,
}

/// Per-individual jackknife accumulator. Holds, for every individual k, the
/// difference between the leave-k-out weighted r² sums and the full-sample
/// sums, so that the leave-one-out mean is recoverable without a second pass
/// over the pairs.
pub(crate) struct JackknifeDeltas {
    pub delta_w   : Vec<f64>,
    pub delta_wr2 : Vec<f64>,
}

impl JackknifeDeltas {
    pub fn new(n_individuals: usize) -> JackknifeDeltas {
        JackknifeDeltas {
            delta_w   : vec![0.0; n_individuals],
            delta_wr2 : vec![0.0; n_individuals],
        }
    }
}

/// Burrows composite-disequilibrium calculator for one population sample at
/// one eligibility map. Reuses its scratch buffers across locus pairs.
pub(crate) struct BurrowsCalculator<'a> {
    sample      : &'a PopulationSample,
    elig        : &'a EligibilityMap,
    has_missing : bool,
    // loci of the pair currently loaded
    cur_p : usize,
    cur_q : usize,
    // scratch, sized per pair
    mob_p    : Vec<u32>,
    mob_q    : Vec<u32>,
    copies_p : Vec<u32>,
    copies_q : Vec<u32>,
    homs_p   : Vec<u32>,
    homs_q   : Vec<u32>,
    sum_cc   : Vec<u32>,
    joint    : Vec<usize>,
    loo_copies_p : Vec<u32>,
    loo_copies_q : Vec<u32>,
    loo_homs_p   : Vec<u32>,
    loo_homs_q   : Vec<u32>,
    loo_sum_cc   : Vec<u32>,
}

impl<'a> BurrowsCalculator<'a> {
    pub fn new(sample: &'a PopulationSample, elig: &'a EligibilityMap) -> BurrowsCalculator<'a> {
        BurrowsCalculator {
            sample,
            elig,
            has_missing : sample.has_missing(),
            cur_p: 0, cur_q: 0,
            mob_p: Vec::new(), mob_q: Vec::new(),
            copies_p: Vec::new(), copies_q: Vec::new(),
            homs_p: Vec::new(), homs_q: Vec::new(),
            sum_cc: Vec::new(), joint: Vec::new(),
            loo_copies_p: Vec::new(), loo_copies_q: Vec::new(),
            loo_homs_p: Vec::new(), loo_homs_q: Vec::new(),
            loo_sum_cc: Vec::new(),
        }
    }

    /// Run the Burrows pass over pair (p, q). Returns `None` when fewer than
    /// two individuals are scored at both loci, or no allele pair is
    /// retained (the pair is then excluded from every denominator).
    ///
    /// When `deltas` is provided, also accumulates the leave-one-out
    /// contribution of every jointly scored individual.
    pub fn pair(&mut self, p: usize, q: usize, mut deltas: Option<&mut JackknifeDeltas>) -> Option<PairStats> {
        self.load_pair(p, q);
        let (mp, mq) = (self.mob_p.len(), self.mob_q.len());
        if mp == 0 || mq == 0 {
            return None
        }

        let n = self.joint.len();
        if n < 2 {
            return None
        }

        // Equal-frequency shortcut: at a 2-allele locus with no drops the
        // four r² values are pairwise ±-linked, so one of them is the mean.
        let shortcut = mp == 2 && mq == 2
            && !self.elig.locus(p).any_dropped
            && !self.elig.locus(q).any_dropped;

        let r2 = mean_r2(
            n, shortcut,
            &self.copies_p, &self.homs_p,
            &self.copies_q, &self.homs_q,
            &self.sum_cc,
        )?;

        if let Some(deltas) = deltas.as_deref_mut() {
            let weight_base = f64::from(self.elig.locus(p).k) * f64::from(self.elig.locus(q).k);
            self.leave_one_out(n, shortcut, weight_base, r2, deltas);
        }

        Some(PairStats { n: n as u32, r2 })
    }

    // Gather per-pair subset counts: retained mobilities, copy/homozygote
    // counts over the jointly scored individuals, and the allele-pair
    // cross-product sums. When the sample has no missing data the subset is
    // the whole sample and the per-locus counts come straight from the
    // allele index.
    fn load_pair(&mut self, p: usize, q: usize) {
        (self.cur_p, self.cur_q) = (p, q);
        let (locus_p, locus_q) = (self.sample.locus(p), self.sample.locus(q));
        let (elig_p, elig_q)   = (self.elig.locus(p), self.elig.locus(q));

        self.mob_p.clear();
        self.mob_p.extend(elig_p.retained.iter().map(|&r| locus_p.alleles()[r].mobility));
        self.mob_q.clear();
        self.mob_q.extend(elig_q.retained.iter().map(|&r| locus_q.alleles()[r].mobility));
        let (mp, mq) = (self.mob_p.len(), self.mob_q.len());

        self.sum_cc.clear();
        self.sum_cc.resize(mp * mq, 0);
        self.joint.clear();

        let (gp, gq) = (locus_p.genotypes(), locus_q.genotypes());
        if self.has_missing {
            self.copies_p.clear(); self.copies_p.resize(mp, 0);
            self.copies_q.clear(); self.copies_q.resize(mq, 0);
            self.homs_p.clear();   self.homs_p.resize(mp, 0);
            self.homs_q.clear();   self.homs_q.resize(mq, 0);

            for k in 0..self.sample.n() {
                let (a, b) = (gp[k], gq[k]);
                if a.is_missing() || b.is_missing() {
                    continue
                }
                self.joint.push(k);
                for (i, &mob) in self.mob_p.iter().enumerate() {
                    let c = a.copies_of(mob);
                    self.copies_p[i] += c;
                    if c == 2 { self.homs_p[i] += 1; }
                }
                for (j, &mob) in self.mob_q.iter().enumerate() {
                    let c = b.copies_of(mob);
                    self.copies_q[j] += c;
                    if c == 2 { self.homs_q[j] += 1; }
                }
                Self::add_cross_products(&mut self.sum_cc, &self.mob_p, &self.mob_q, a, b, true);
            }
        } else {
            // Subset == full sample: reuse the finalized allele counts.
            self.copies_p.clear();
            self.copies_p.extend(elig_p.retained.iter().map(|&r| locus_p.alleles()[r].copies));
            self.copies_q.clear();
            self.copies_q.extend(elig_q.retained.iter().map(|&r| locus_q.alleles()[r].copies));
            self.homs_p.clear();
            self.homs_p.extend(elig_p.retained.iter().map(|&r| locus_p.alleles()[r].homozygotes));
            self.homs_q.clear();
            self.homs_q.extend(elig_q.retained.iter().map(|&r| locus_q.alleles()[r].homozygotes));

            for k in 0..self.sample.n() {
                self.joint.push(k);
                Self::add_cross_products(&mut self.sum_cc, &self.mob_p, &self.mob_q, gp[k], gq[k], true);
            }
        }
    }

    fn add_cross_products(
        sum_cc: &mut [u32],
        mob_p: &[u32], mob_q: &[u32],
        a: popgene::Genotype, b: popgene::Genotype,
        add: bool,
    ) {
        let mq = mob_q.len();
        for (i, &mp_mob) in mob_p.iter().enumerate() {
            let ci = a.copies_of(mp_mob);
            if ci == 0 {
                continue
            }
            for (j, &mq_mob) in mob_q.iter().enumerate() {
                let cj = b.copies_of(mq_mob);
                if cj == 0 {
                    continue
                }
                let cell = &mut sum_cc[i * mq + j];
                if add { *cell += ci * cj } else { *cell -= ci * cj }
            }
        }
    }

    // Leave-one-out r² and weight for every jointly scored individual,
    // folded into the running jackknife deltas. Individuals missing at
    // either locus leave the pair untouched (delta 0).
    fn leave_one_out(&mut self, n: usize, shortcut: bool, weight_base: f64, full_r2: f64, deltas: &mut JackknifeDeltas) {
        let full_weight = if self.has_missing {
            weight_base * (n as f64) * (n as f64)
        } else {
            weight_base
        };

        for idx in 0..self.joint.len() {
            let k = self.joint[idx];
            let loo_n = n - 1;
            let loo_stats = if loo_n < 2 {
                None // pair drops out entirely for this individual
            } else {
                self.loo_pair_r2(k, loo_n, shortcut)
            };

            let (loo_w, loo_wr2) = match loo_stats {
                None => (0.0, 0.0),
                Some(r2) => {
                    let w = if self.has_missing {
                        weight_base * (loo_n as f64) * (loo_n as f64)
                    } else {
                        weight_base
                    };
                    (w, w * r2)
                }
            };
            deltas.delta_w[k]   += loo_w - full_weight;
            deltas.delta_wr2[k] += loo_wr2 - full_weight * full_r2;
        }
    }

    fn loo_pair_r2(&mut self, k: usize, loo_n: usize, shortcut: bool) -> Option<f64> {
        let (a, b) = (self.pair_genotype_p(k), self.pair_genotype_q(k));

        self.loo_copies_p.clone_from(&self.copies_p);
        self.loo_copies_q.clone_from(&self.copies_q);
        self.loo_homs_p.clone_from(&self.homs_p);
        self.loo_homs_q.clone_from(&self.homs_q);
        self.loo_sum_cc.clone_from(&self.sum_cc);

        for (i, &mob) in self.mob_p.iter().enumerate() {
            let c = a.copies_of(mob);
            self.loo_copies_p[i] -= c;
            if c == 2 { self.loo_homs_p[i] -= 1; }
        }
        for (j, &mob) in self.mob_q.iter().enumerate() {
            let c = b.copies_of(mob);
            self.loo_copies_q[j] -= c;
            if c == 2 { self.loo_homs_q[j] -= 1; }
        }
        Self::add_cross_products(&mut self.loo_sum_cc, &self.mob_p, &self.mob_q, a, b, false);

        mean_r2(
            loo_n, shortcut,
            &self.loo_copies_p, &self.loo_homs_p,
            &self.loo_copies_q, &self.loo_homs_q,
            &self.loo_sum_cc,
        )
    }

    fn pair_genotype_p(&self, k: usize) -> popgene::Genotype {
        self.sample.locus(self.cur_p).genotypes()[k]
    }

    fn pair_genotype_q(&self, k: usize) -> popgene::Genotype {
        self.sample.locus(self.cur_q).genotypes()[k]
    }
}

/// Mean Burrows r² over the retained allele pairs of one locus pair, from
/// subset counts. `None` when no allele pair is available.
fn mean_r2(
    n: usize, shortcut: bool,
    copies_p: &[u32], homs_p: &[u32],
    copies_q: &[u32], homs_q: &[u32],
    sum_cc: &[u32],
) -> Option<f64> {
    let (mp, mq) = (copies_p.len(), copies_q.len());
    if mp == 0 || mq == 0 {
        return None
    }
    let n_f     = n as f64;
    let genes   = 2.0 * n_f;
    let eps_var = 1.0 / (8.0 * n_f * n_f);

    let single = |i: usize, j: usize| -> f64 {
        let qi = f64::from(copies_p[i]) / genes;
        let qj = f64::from(copies_q[j]) / genes;
        let vi = qi * (1.0 - 2.0 * qi) + f64::from(homs_p[i]) / n_f;
        let vj = qj * (1.0 - 2.0 * qj) + f64::from(homs_q[j]) / n_f;
        if vi <= eps_var || vj <= eps_var {
            // heterozygote-throughout: no usable variance at this allele
            return 0.0
        }
        let mut delta = f64::from(sum_cc[i * mq + j]) / genes - 2.0 * qi * qj;
        delta *= n_f / (n_f - 1.0);
        let r = delta / (vi * vj).sqrt();
        (r * r).min(1.0)
    };

    if shortcut {
        return Some(single(0, 0))
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..mp {
        for j in 0..mq {
            total += single(i, j);
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_r2_is_strictly_decreasing() {
        let mut previous = expected_r2(1.0);
        for s in 2..200 {
            let current = expected_r2(f64::from(s));
            assert!(current < previous, "E[r²|S] not decreasing at S = {s}");
            previous = current;
        }
    }

    #[test]
    fn expected_r2_branch_values() {
        // S = 2 (small-sample branch): 0.0018 + 0.907/2 + 4.44/4
        approx::assert_relative_eq!(expected_r2(2.0), 1.5653, max_relative = 1e-4);
        // S = 100 (large-sample branch): 0.01 + 3.19/10000
        approx::assert_relative_eq!(expected_r2(100.0), 0.010319, max_relative = 1e-4);
    }

    #[test]
    fn ne_inversion_monotone() {
        // Larger drift r² must give smaller Ne, fixed S and mating model.
        let mut previous = invert_ne(0.0005, 100.0, MatingModel::Random).unwrap();
        for step in 1..50 {
            let drift = 0.0005 + 0.0002 * f64::from(step);
            let ne = invert_ne(drift, 100.0, MatingModel::Random).unwrap();
            assert!(ne < previous);
            previous = ne;
        }
    }

    #[test]
    fn ne_inversion_known_value() {
        // r = 1/(3N) - 0.69/N² at N = 100: r = 0.0032643333...
        let r = 1.0 / 300.0 - 0.69 / 10_000.0;
        let ne = invert_ne(r, 50.0, MatingModel::Random).unwrap();
        approx::assert_relative_eq!(ne, 100.0, max_relative = 1e-6);
    }

    #[test]
    fn non_positive_drift_is_infinite() {
        assert!(invert_ne(0.0, 50.0, MatingModel::Random).is_none());
        assert!(invert_ne(-0.3, 50.0, MatingModel::Random).is_none());
    }

    #[test]
    fn discriminant_clamps_at_zero() {
        // Huge drift: the discriminant would be negative; Ne stays positive.
        let ne = invert_ne(0.9, 50.0, MatingModel::Random).unwrap();
        assert!(ne > 0.0 && ne < 1.0);
    }
}
