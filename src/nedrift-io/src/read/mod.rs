pub mod genotype_reader;
pub mod chromosome_map;
