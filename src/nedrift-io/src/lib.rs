//! Input and output boundary of the estimation pipeline: genotype file
//! readers, the chromosome map reader, and the result writers.

pub mod read;
pub use read::genotype_reader::{GenotypeFormat, GenotypeInput, GenotypeReader, GenotypeReaderError};
pub use read::chromosome_map::ChromosomeMap;

pub mod write;
pub use write::generic_writer::GenericWriter;
pub use write::report::ReportWriter;
pub use write::tabular::TabularWriter;
pub use write::dumps;
