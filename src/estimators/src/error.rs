use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Failed to allocate the locus-pair scratch store for population {0}")]
    PairStoreAllocation(String, #[source] std::io::Error),

    #[error("Chromosome grouping was requested, but no locus carries a chromosome assignment")]
    MissingChromosomeMap,
}
