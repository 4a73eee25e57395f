use std::{
    fs::File,
    path::PathBuf,
};

use located_error::LocatedError;

use clap::{ArgEnum, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use log::debug;
use anyhow::Result;

mod error;
pub use error::ParserError;

mod ranges;
pub use ranges::{parse_ranges, parse_range_pairs};

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[clap(name="nedrift-rs", version, about, long_about = None)]
#[clap(propagate_version = true)]
/// NEDRIFT-rs: effective population size estimation from genotype data
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Warnings are shown even when this flag is off; use --quiet to
    /// silence them.
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings; only errors are shown.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Serialize the command line arguments into a `.yaml` file named
    /// `{current time}-estimate.yaml` at the root of `--output-dir`.
    ///
    /// # Errors
    /// When serialization or the write fails.
    pub fn serialize(&self) -> Result<()> {
        let serialized = serde_yaml::to_string(&self)
            .loc("While serializing command line arguments")?;
        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file = match &self.commands {
            Commands::Estimate { est } => est.output_dir.join(format!("{current_time}-estimate.yaml")),
            Commands::FromYaml { .. } | Commands::Cite => return Ok(()),
        };
        std::fs::write(&output_file, serialized)
            .with_loc(|| format!("While writing arguments into {}", output_file.display()))
    }

    /// Deserialize a previously serialized `.yaml` back into arguments.
    ///
    /// # Errors
    /// When the file is unreadable or fails to parse back into `Self`.
    pub fn deserialize(yaml: &PathBuf) -> Result<Cli> {
        let file = File::open(yaml)
            .with_loc(|| format!("While opening {}", yaml.display()))?;
        serde_yaml::from_reader(file)
            .with_loc(|| format!("While parsing {}", yaml.display()))
    }
}

#[derive(Subcommand, Debug, Clone, Serialize, Deserialize)]
pub enum Commands {
    /// Estimate Ne/Nb from a genotype input file.
    Estimate {
        #[clap(flatten)]
        est: Box<Estimate> // Box<T>: by far the largest variant
    },

    /// Re-run a previously generated .yaml configuration file.
    ///
    /// This re-applies an estimation run with the exact same parameters and
    /// arguments.
    FromYaml {
        yaml: PathBuf,
    },

    /// Print the method references tied to this project.
    Cite,
}

/// The genotype input format, when the file extension is not conclusive.
#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    /// Fixed four-field header, one locus name per line ('.dat').
    Fstat,
    /// 'pop'-separated blocks with free title line ('.gen').
    Genepop,
}

/// Mating model assumed by the LD estimator.
#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mating {
    #[default]
    Random,
    Monogamy,
}

/// Locus-pair restriction of the LD estimator.
#[derive(ArgEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Grouping {
    /// Every pair of loci.
    #[default]
    All,
    /// Pairs within one chromosome.
    Within,
    /// Pairs across different chromosomes.
    Between,
}

/// Estimate Ne/Nb from a genotype input file.
///
/// Runs the enabled estimators (linkage disequilibrium, heterozygote excess,
/// molecular coancestry, temporal F-statistics) on every population of the
/// input, at every requested critical frequency.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Estimate {
    /// Input genotype file.
    ///
    /// Two text formats are accepted:{n}
    ///   '.dat' : fixed header (pop count, locus count, max mobility, digit width){n}
    ///   '.gen' : free title, locus names, then 'pop'-separated blocks{n}
    #[clap(short, long)]
    pub input: String,

    /// Force the input format instead of inferring it from the extension.
    #[clap(long, arg_enum)]
    pub input_format: Option<InputFormat>,

    /// Output directory where results will be written.
    ///
    /// The leaf directory is created when absent; parent directories are not.
    #[clap(short, long, default_value("nedrift-output"))]
    pub output_dir: PathBuf,

    /// Overwrite existing output files.
    #[clap(short='w', long)]
    pub overwrite: bool,

    /// Run the linkage-disequilibrium estimator.
    ///
    /// When no estimator flag is given, the LD estimator runs alone.
    #[clap(long)]
    pub ld: bool,

    /// Run the heterozygote-excess estimator.
    #[clap(long)]
    pub het: bool,

    /// Run the molecular-coancestry estimator.
    #[clap(long)]
    pub coan: bool,

    /// Run the temporal estimators.
    ///
    /// Requires --generations, with one generation time per population of
    /// the input (populations are then read as successive samples of one
    /// population).
    #[clap(long)]
    pub temporal: bool,

    /// Critical allele frequencies.
    ///
    /// Alleles rarer than a critical value are excluded (LD, heterozygote
    /// excess) or lumped (temporal) at that value. '1.0' stands for
    /// "drop singletons only"; 0 is appended when absent.
    #[clap(short, long, multiple_values(true), default_values(&["0.05", "0.02", "0.01"]))]
    pub pcrit: Vec<f64>,

    /// Mating model assumed by the LD estimator.
    #[clap(long, arg_enum, default_value("random"))]
    pub mating: Mating,

    /// Skip the parametric (chi-square / Student-t) confidence intervals.
    #[clap(long)]
    pub no_parametric_ci: bool,

    /// Skip the jackknife confidence intervals.
    #[clap(long)]
    pub no_jackknife_ci: bool,

    /// Widen the parametric CI by the jackknife CI when both are available.
    #[clap(long)]
    pub merge_ci: bool,

    /// Re-weight locus pairs around the initial estimate when the sample
    /// carries missing data (LD and Pollak temporal weights).
    #[clap(long)]
    pub reweight_missing: bool,

    /// Census size of breeding adults for temporal Plan I; 0 selects Plan II.
    #[clap(long, default_value("0"))]
    pub census: u32,

    /// Generation time of each input population, strictly increasing.
    ///
    /// Example: '--generations 0 2 5' reads three populations as samples of
    /// one population taken at generations 0, 2 and 5.
    #[clap(short, long, multiple_values(true))]
    pub generations: Vec<f64>,

    /// Cap on individuals read per population; the rest are skipped.
    #[clap(long)]
    pub max_individuals: Option<usize>,

    /// Restrict to a range of populations (1-based, inclusive).
    ///
    /// Accepts slices such as '--populations 2-4' and discrete values.
    #[clap(long, multiple_values(true))]
    pub populations: Vec<String>,

    /// Restrict analysis to these loci (1-based, inclusive ranges).
    ///
    /// Example: '--loci 1-10 25 30-32'. Ranges may overlap; they are merged.
    #[clap(long, multiple_values(true))]
    pub loci: Vec<String>,

    /// Chromosome/locus map file ('<chromosome> <locus>' per line).
    ///
    /// Loci absent from the map are assigned to a synthetic 'unknown'
    /// chromosome. Required for --grouping within/between.
    #[clap(long)]
    pub chromosome_map: Option<String>,

    /// Restrict LD locus pairs by chromosome.
    #[clap(long, arg_enum, default_value("all"))]
    pub grouping: Grouping,

    /// Write the per-estimator tabular files next to the main report.
    #[clap(long)]
    pub tabular: bool,

    /// Tab-delimit the tabular files instead of fixed-width columns.
    #[clap(long)]
    pub tab_delimited: bool,

    /// Write the per-pair Burrows coefficient dump (LD).
    #[clap(long)]
    pub burrows_dump: bool,

    /// Write the per-locus data dump.
    #[clap(long)]
    pub locus_dump: bool,

    /// Write the missing-data report.
    #[clap(long)]
    pub missing_report: bool,
}

impl Estimate {
    /// Whether any single-sample estimator flag was given; when none is,
    /// the LD estimator is the default.
    #[must_use]
    pub fn effective_methods(&self) -> (bool, bool, bool, bool) {
        let temporal = self.temporal || !self.generations.is_empty();
        if !self.ld && !self.het && !self.coan && !temporal {
            return (true, false, false, false)
        }
        (self.ld, self.het, self.coan, temporal)
    }

    /// Sanity-check the temporal arguments against the input.
    ///
    /// # Errors
    /// - `MissingGenerations` when temporal mode lacks generation times.
    /// - `GenerationCount` when their number differs from the populations.
    pub fn check_generations(&self, n_populations: usize) -> Result<()> {
        let (.., temporal) = self.effective_methods();
        if !temporal {
            return Ok(())
        }
        if self.generations.is_empty() {
            return Err(ParserError::MissingGenerations).loc("While validating temporal arguments")
        }
        if self.generations.len() != n_populations {
            return Err(ParserError::GenerationCount {
                expected: n_populations,
                found: self.generations.len(),
            }).loc("While validating temporal arguments")
        }
        Ok(())
    }

    /// 1-based population range, from the `--populations` ranges.
    ///
    /// # Errors
    /// On unparseable range tokens.
    pub fn population_range(&self) -> Result<Option<(usize, usize)>> {
        if self.populations.is_empty() {
            return Ok(None)
        }
        let ranges = parse_range_pairs(&self.populations, "populations")?;
        let low  = ranges.iter().map(|r| r.0).min().expect("non-empty ranges");
        let high = ranges.iter().map(|r| r.1).max().expect("non-empty ranges");
        Ok(Some((low, high)))
    }

    /// 1-based locus ranges from `--loci`.
    ///
    /// # Errors
    /// On unparseable range tokens.
    pub fn locus_ranges(&self) -> Result<Vec<(usize, usize)>> {
        if self.loci.is_empty() {
            return Ok(Vec::new())
        }
        parse_range_pairs(&self.loci, "loci")
    }
}

/// All citations tied to the implemented estimators.
pub const CITATIONS: &[&str] = &[
    "Waples R.S. (2006) A bias correction for estimates of effective population size based on linkage disequilibrium at unlinked gene loci. Conservation Genetics 7:167-184.",
    "Waples R.S. & Do C. (2008) LDNE: a program for estimating effective population size from data on linkage disequilibrium. Molecular Ecology Resources 8:753-756.",
    "Zhdanova O.L. & Pudovkin A.I. (2008) Nb_HetEx: a program to estimate the effective number of breeders. Journal of Heredity 99:694-695.",
    "Nomura T. (2008) Estimation of effective number of breeders from molecular coancestry of single cohort sample. Evolutionary Applications 1:462-474.",
    "Pollak E. (1983) A new method for estimating the effective population size from allele frequency changes. Genetics 104:531-548.",
    "Nei M. & Tajima F. (1981) Genetic drift and estimation of effective population size. Genetics 98:625-640.",
    "Jorde P.E. & Ryman N. (2007) Unbiased estimator for genetic drift and effective population size. Genetics 177:927-935.",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn minimal_estimate_run() {
        let cli = parse(&["nedrift-rs", "estimate", "--input", "data.dat"]);
        let Commands::Estimate { est: estimate } = cli.commands else { panic!("expected estimate") };
        assert_eq!(estimate.input, "data.dat");
        // LD is the default estimator.
        assert_eq!(estimate.effective_methods(), (true, false, false, false));
        assert_eq!(estimate.pcrit, vec![0.05, 0.02, 0.01]);
    }

    #[test]
    fn generations_imply_temporal() {
        let cli = parse(&["nedrift-rs", "estimate", "-i", "data.gen", "--generations", "0", "2", "5"]);
        let Commands::Estimate { est: estimate } = cli.commands else { panic!("expected estimate") };
        let (ld, _, _, temporal) = estimate.effective_methods();
        assert!(!ld);
        assert!(temporal);
        assert!(estimate.check_generations(3).is_ok());
        assert!(estimate.check_generations(2).is_err());
    }

    #[test]
    fn population_range_bounds() -> Result<()> {
        let cli = parse(&["nedrift-rs", "estimate", "-i", "x.dat", "--populations", "2-4", "7"]);
        let Commands::Estimate { est: estimate } = cli.commands else { panic!("expected estimate") };
        assert_eq!(estimate.population_range()?, Some((2, 7)));
        Ok(())
    }

    #[test]
    fn verbosity_counts_occurrences() {
        let cli = parse(&["nedrift-rs", "-vvv", "estimate", "-i", "x.dat"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn yaml_roundtrip() -> Result<()> {
        let cli = parse(&["nedrift-rs", "estimate", "-i", "x.dat", "--het", "--pcrit", "0.05", "1.0"]);
        let serialized = serde_yaml::to_string(&cli)?;
        let restored: Cli = serde_yaml::from_str(&serialized)?;
        let Commands::Estimate { est: estimate } = restored.commands else { panic!("expected estimate") };
        assert!(estimate.het);
        assert_eq!(estimate.pcrit, vec![0.05, 1.0]);
        Ok(())
    }
}
