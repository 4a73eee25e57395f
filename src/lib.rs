//! Run orchestration: wire the parsed CLI into the readers, the estimation
//! controller and the writers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use located_error::LocatedError;
use log::{info, warn};

use estimators::{ChromosomeGrouping, Controller, EstimatorConfig, MatingModel, Methods, PopulationResult};
use nedrift_io::{dumps, ChromosomeMap, GenotypeFormat, GenotypeReader, ReportWriter, TabularWriter};
use nedrift_io::read::genotype_reader::ReadOptions;
use popgene::{PcritList, Plan, TemporalSeries};

/// Main runner for the `estimate` subcommand.
///
/// # Errors
/// Structural input errors, unwritable outputs and invalid argument
/// combinations are fatal; per-population numerical degeneracies are not.
pub fn run(cli: &parser::Cli, est: &parser::Estimate) -> Result<()> {
    // ----------------------------- Prepare the output workspace.
    prepare_output_dir(&est.output_dir)?;
    if let Err(e) = cli.serialize() {
        warn!("Could not serialize the run arguments: {e}");
    }
    let stem = input_stem(&est.input);
    let report_path = output_path(est, &stem, "ne.txt")?;

    // ----------------------------- Build the estimator configuration.
    let (ld, het, coan, temporal) = est.effective_methods();
    let config = EstimatorConfig {
        methods          : Methods { ld, het, coan, temporal },
        mating           : match est.mating {
            parser::Mating::Random   => MatingModel::Random,
            parser::Mating::Monogamy => MatingModel::Monogamy,
        },
        grouping         : match est.grouping {
            parser::Grouping::All     => ChromosomeGrouping::All,
            parser::Grouping::Within  => ChromosomeGrouping::Within,
            parser::Grouping::Between => ChromosomeGrouping::Between,
        },
        parametric_ci    : !est.no_parametric_ci,
        jackknife_ci     : !est.no_jackknife_ci,
        merge_ci         : est.merge_ci,
        reweight_missing : est.reweight_missing,
        record_pairs     : est.burrows_dump,
        spill_threshold  : EstimatorConfig::DEFAULT_SPILL_THRESHOLD,
    };

    // ----------------------------- Read the genotype input.
    let read_options = ReadOptions {
        max_individuals  : est.max_individuals,
        population_range : est.population_range()?,
    };
    let format = est.input_format.map(|f| match f {
        parser::InputFormat::Fstat   => GenotypeFormat::Fstat,
        parser::InputFormat::Genepop => GenotypeFormat::Genepop,
    });
    let input = GenotypeReader::new(&est.input, format, read_options)?.read()?;
    let (mut loci, populations) = (input.loci, input.populations);

    // ----------------------------- Locus restriction and chromosome map.
    loci.restrict_to_ranges(&est.locus_ranges()?);
    if let Some(map_path) = &est.chromosome_map {
        let map = ChromosomeMap::read(map_path)?;
        map.assign(&mut loci);
    } else if est.grouping != parser::Grouping::All {
        return Err(anyhow!("--grouping {:?} requires --chromosome-map", est.grouping))
    }

    // ----------------------------- Critical values and temporal sanity.
    let pcrits = PcritList::parse(&est.pcrit)
        .loc("While parsing the --pcrit argument")?;
    est.check_generations(populations.len())?;

    // ----------------------------- Run the estimators.
    let controller = Controller::new(&loci, &pcrits, &config);
    let mut report = ReportWriter::new(Some(&report_path))?;
    report.header(&est.input, config.mating, &pcrits)?;

    let mut population_results: Vec<PopulationResult> = Vec::new();
    if config.methods.any_single_sample() {
        for sample in &populations {
            let result = controller.run_population(sample)?;
            report.population(&result)?;
            population_results.push(result);
        }
    }

    // ----------------------------- Optional dumps.
    if est.locus_dump {
        dumps::locus_dump(output_path(est, &stem, "loci.tsv")?, &loci, &populations)?;
    }
    if est.missing_report {
        if populations.iter().any(popgene::PopulationSample::has_missing) {
            dumps::missing_report(output_path(est, &stem, "missing.tsv")?, &loci, &populations)?;
        } else {
            info!("No missing data: the missing-data report was not written");
        }
    }
    if est.burrows_dump && !population_results.is_empty() {
        dumps::burrows_dump(output_path(est, &stem, "burrows.tsv")?, &loci, &population_results)?;
    }

    // ----------------------------- Tabular files.
    if est.tabular && !population_results.is_empty() {
        if config.methods.ld {
            TabularWriter::new(Some(output_path(est, &stem, "ld.tsv")?), est.tab_delimited)?
                .write_ld(&population_results)?;
        }
        if config.methods.het {
            TabularWriter::new(Some(output_path(est, &stem, "het.tsv")?), est.tab_delimited)?
                .write_het(&population_results)?;
        }
        if config.methods.coan {
            TabularWriter::new(Some(output_path(est, &stem, "coan.tsv")?), est.tab_delimited)?
                .write_coan(&population_results)?;
        }
    }

    // ----------------------------- Temporal series over the populations.
    if config.methods.temporal {
        let series = TemporalSeries::new(populations, est.generations.clone(), Plan::from_census(est.census))
            .loc("While assembling the temporal series")?;
        let result = controller.run_series(&series);
        report.temporal(&series, &result)?;
        if est.tabular {
            TabularWriter::new(Some(output_path(est, &stem, "temporal.tsv")?), est.tab_delimited)?
                .write_temporal(&series, &result)?;
        }
    }

    info!("Results written to {}", report_path.display());
    Ok(())
}

// Create the leaf output directory when absent; parent directories are the
// user's responsibility.
fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(())
    }
    fs::create_dir(dir)
        .with_loc(|| format!("While creating the output directory {}", dir.display()))
}

fn input_stem(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("nedrift")
        .to_string()
}

// `{output_dir}/{stem}-{suffix}`, refusing to clobber without --overwrite.
fn output_path(est: &parser::Estimate, stem: &str, suffix: &str) -> Result<PathBuf> {
    let path = est.output_dir.join(format!("{stem}-{suffix}"));
    if path.exists() && !est.overwrite {
        return Err(anyhow!("{} already exists. Use --overwrite to replace it", path.display()))
    }
    Ok(path)
}
