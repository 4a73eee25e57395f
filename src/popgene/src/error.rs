use thiserror::Error;

#[derive(Error, Debug)]
pub enum PopgeneError {
    #[error("Individual carries {found} genotypes, but {expected} loci were declared")]
    LocusCountMismatch { expected: usize, found: usize },

    #[error("Half-missing genotype ({0}, {1}): alleles must either both be scored, or both be missing")]
    HalfMissing(u32, u32),

    #[error("Invalid critical frequency {0}: expected 0, a value within (0, 0.5), or the singleton marker 1.0")]
    InvalidPcrit(f64),

    #[error("A temporal series requires at least two samples (got {0})")]
    NotEnoughSamples(usize),

    #[error("Generation times must be strictly increasing (got {0} after {1})")]
    NonIncreasingTimes(f64, f64),

    #[error("Samples of one temporal series must share the same locus set ({0} loci vs {1})")]
    LocusSetMismatch(usize, usize),
}
