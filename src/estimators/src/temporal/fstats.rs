use popgene::{Pcrit, PopulationSample};

/// Per-locus F-statistics for one ordered sample pair, after lumping of
/// low-frequency alleles.
#[derive(Debug, Clone)]
pub(crate) struct LocusFStats {
    /// Pollak Fk: Σ(x-y)²/p over working alleles, divided by A-1.
    pub fk             : f64,
    /// Nei/Tajima Fc: Σ(x-y)²/(p - xy), divided by A.
    pub fc             : f64,
    /// Jorde/Ryman numerator Σ(x-y)² and denominator Σ p(1-p), kept as sums.
    pub fs_num         : f64,
    pub fs_den         : f64,
    /// Working allele count (retained + composite).
    pub a              : f64,
    /// Gene sample sizes (2 × scored individuals) in each sample.
    pub genes_a        : f64,
    pub genes_b        : f64,
    /// 1/nₐ + 1/n_b over gene counts.
    pub hbar           : f64,
    /// Harmonic pair size 2/h̄, the nℓ of the missing-data weights.
    pub harmonic_genes : f64,
}

/// Compute the per-locus statistics for one locus of a sample pair, or
/// `None` when the locus is unusable (unscored in either sample, or fewer
/// than two working alleles after lumping).
pub(crate) fn locus_fstats(
    sample_a: &PopulationSample,
    sample_b: &PopulationSample,
    locus_index: usize,
    pcrit: Pcrit,
) -> Option<LocusFStats> {
    let (data_a, data_b) = (sample_a.locus(locus_index), sample_b.locus(locus_index));
    let (n_a, n_b) = (data_a.n_scored(), data_b.n_scored());
    if n_a == 0 || n_b == 0 {
        return None
    }
    let (genes_a, genes_b) = (2.0 * n_a as f64, 2.0 * n_b as f64);

    // Frequency pairs over the allele union of both samples.
    let mut union: Vec<(f64, f64)> = Vec::new();
    for allele in data_a.alleles() {
        let y = data_b.rank_of(allele.mobility).map_or(0.0, |r| data_b.alleles()[r].freq);
        union.push((allele.freq, y));
    }
    for allele in data_b.alleles() {
        if data_a.rank_of(allele.mobility).is_none() {
            union.push((0.0, allele.freq));
        }
    }

    // Lump alleles whose size-weighted mean frequency falls below the
    // critical value into one composite allele.
    let c = pcrit.effective(n_a + n_b);
    let mut working: Vec<(f64, f64)> = Vec::new();
    let (mut lump_x, mut lump_y) = (0.0, 0.0);
    let mut lumped = false;
    for (x, y) in union {
        let weighted_mean = (x * genes_a + y * genes_b) / (genes_a + genes_b);
        if weighted_mean < c {
            lump_x += x;
            lump_y += y;
            lumped = true;
        } else {
            working.push((x, y));
        }
    }
    if lumped && (lump_x > 0.0 || lump_y > 0.0) {
        working.push((lump_x, lump_y));
    }
    if working.len() < 2 {
        return None
    }

    let mut sum_fk  = 0.0;
    let mut sum_fc  = 0.0;
    let mut fs_num  = 0.0;
    let mut fs_den  = 0.0;
    for &(x, y) in &working {
        let p  = (x + y) / 2.0;
        let sq = (x - y) * (x - y);
        if p > 0.0 {
            sum_fk += sq / p;
        }
        let fc_den = p - x * y;
        if fc_den > 0.0 {
            sum_fc += sq / fc_den;
        }
        fs_num += sq;
        fs_den += p * (1.0 - p);
    }

    let a    = working.len() as f64;
    let hbar = 1.0 / genes_a + 1.0 / genes_b;
    Some(LocusFStats {
        fk             : sum_fk / (a - 1.0),
        fc             : sum_fc / a,
        fs_num,
        fs_den,
        a,
        genes_a,
        genes_b,
        hbar,
        harmonic_genes : 2.0 / hbar,
    })
}
