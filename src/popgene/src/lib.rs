//! Shared data model of the estimation engines: loci, alleles, per-population
//! allele indexes, critical-frequency filtering and temporal series.

mod locus;
pub use locus::{Locus, LocusSet, ChromosomeId, UNKNOWN_CHROMOSOME};

mod allele;
pub use allele::Allele;

mod genotype;
pub use genotype::Genotype;

mod sample;
pub use sample::{PopulationSample, LocusData};

mod pcrit;
pub use pcrit::{Pcrit, PcritList};

mod eligibility;
pub use eligibility::{EligibilityMap, LocusEligibility};

mod series;
pub use series::{TemporalSeries, Plan};

mod error;
pub use error::PopgeneError;
