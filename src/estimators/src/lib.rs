//! The four Ne estimation engines and their per-population controller.
//!
//! Every engine consumes the shared `popgene` data model and returns its
//! estimates as [`result::NeEstimate`] values, with ∞ represented internally
//! as `None` and converted to the output sentinel only at the writing
//! boundary.

pub mod config;
pub use config::{EstimatorConfig, MatingModel, ChromosomeGrouping, Methods, EPSILON, INFINITE_SENTINEL};

pub mod result;
pub use result::{Ci, CiOutcome, NeEstimate};

pub mod ld;
pub use ld::{LdEngine, LdOutcome};

pub mod het;
pub use het::{HetEngine, HetOutcome};

pub mod coan;
pub use coan::{CoanEngine, CoanOutcome};

pub mod temporal;
pub use temporal::{TempEngine, TempFlavor, TempOutcome};

pub mod controller;
pub use controller::{Controller, PopulationResult, PcritBlock, TemporalResult};

mod error;
pub use error::EstimatorError;
