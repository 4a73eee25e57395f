/// Numerical floor below which a statistic is considered degenerate.
pub const EPSILON: f64 = 1.0e-10;

/// Wire value standing for an infinite estimate in output files. Internally
/// infinite estimates are `None`; the sentinel only appears at the writing
/// boundary.
pub const INFINITE_SENTINEL: f64 = 1.0e10;

/// Mating model assumed by the LD estimator's r²→Ne inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatingModel {
    #[default]
    Random,
    Monogamy,
}

/// Which locus pairs the LD estimator enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromosomeGrouping {
    /// Every pair of used loci.
    #[default]
    All,
    /// Both loci on the same chromosome.
    Within,
    /// Loci on different chromosomes.
    Between,
}

/// Which estimators are enabled for the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Methods {
    pub ld       : bool,
    pub het      : bool,
    pub coan     : bool,
    pub temporal : bool,
}

impl Methods {
    #[must_use]
    pub fn any_single_sample(&self) -> bool {
        self.ld || self.het || self.coan
    }
}

/// Immutable run-wide tunables, passed explicitly to every engine.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub methods          : Methods,
    pub mating           : MatingModel,
    pub grouping         : ChromosomeGrouping,
    /// Compute the parametric (chi-square / Student-t) confidence interval.
    pub parametric_ci    : bool,
    /// Compute the jackknife confidence interval.
    pub jackknife_ci     : bool,
    /// Widen the parametric CI by the jackknife CI when both are available.
    pub merge_ci         : bool,
    /// One extra weighting round around the initial Ne estimate when the
    /// sample has missing data (LD pair weights, temporal Pollak weights).
    pub reweight_missing : bool,
    /// Keep the per-pair Burrows records for the pair dump file.
    pub record_pairs     : bool,
    /// Locus-pair count past which the LD scratch store spills to a
    /// memory-mapped temporary file instead of staying in memory.
    pub spill_threshold  : usize,
}

impl EstimatorConfig {
    /// Default spill threshold: ~4M pair records stay in memory.
    pub const DEFAULT_SPILL_THRESHOLD: usize = 1 << 22;
}

impl Default for EstimatorConfig {
    fn default() -> EstimatorConfig {
        EstimatorConfig {
            methods          : Methods::default(),
            mating           : MatingModel::default(),
            grouping         : ChromosomeGrouping::default(),
            parametric_ci    : true,
            jackknife_ci     : true,
            merge_ci         : false,
            reweight_missing : false,
            record_pairs     : false,
            spill_threshold  : Self::DEFAULT_SPILL_THRESHOLD,
        }
    }
}
