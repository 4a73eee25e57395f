mod common;
use common::EstimateRunnerBuilder;

use anyhow::Result;

// Two populations, three microsatellite loci, some missing data.
const FSTAT_FIXTURE: &str = "\
2 3 99 2
LocusA
LocusB
LocusC
north, 0101 0102 0202
north, 0102 0102 0101
north, 0202 0101 0102
north, 0101 0000 0202
north, 0102 0202 0101
north, 0201 0102 0102
south, 0202 0101 0102
south, 0101 0102 0202
south, 0102 0202 0101
south, 0101 0101 0102
south, 0202 0102 0201
";

// One biallelic locus sampled at two time points: 0.5 -> 0.6 over one
// generation with 50 individuals per sample.
fn temporal_fixture() -> String {
    let mut text = String::from("temporal drift fixture\nLocusA\npop\n");
    for i in 0..50 {
        let genotype = if i < 25 { "0101" } else { "0202" };
        text.push_str(&format!("t0-{i}, {genotype}\n"));
    }
    text.push_str("pop\n");
    for i in 0..50 {
        let genotype = if i < 30 { "0101" } else { "0202" };
        text.push_str(&format!("t1-{i}, {genotype}\n"));
    }
    text
}

#[test]
fn test_estimate_all_single_sample_methods() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input(FSTAT_FIXTURE)
        .configure(|est| {
            est.ld = true;
            est.het = true;
            est.coan = true;
            est.tabular = true;
            est.locus_dump = true;
            est.missing_report = true;
            est.pcrit = vec![0.02];
        })
        .build()?;

    runner.run()?;
    let report = runner.report()?;

    assert!(report.contains("Population north"));
    assert!(report.contains("Population south"));
    assert!(report.contains("Linkage disequilibrium"));
    assert!(report.contains("Heterozygote excess"));
    assert!(report.contains("Molecular coancestry"));
    // north carries one missing genotype at LocusB.
    assert!(report.contains("missing data present"));

    for suffix in ["ld.tsv", "het.tsv", "coan.tsv", "loci.tsv", "missing.tsv"] {
        assert!(runner.output_file(suffix).is_file(), "{suffix} not written");
    }
    Ok(())
}

#[test]
fn test_estimate_temporal_genepop() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input_name("drift.gen")
        .input(&temporal_fixture())
        .configure(|est| {
            est.generations = vec![0.0, 1.0];
            est.pcrit = vec![0.0];
            est.tabular = true;
        })
        .build()?;

    runner.run()?;
    let report = runner.report()?;

    assert!(report.contains("Temporal series (2 samples, Plan II)"));
    assert!(report.contains("Pollak Fk"));
    assert!(report.contains("Nei/Tajima Fc"));
    assert!(report.contains("Jorde/Ryman Fs"));
    // Fk' = Fk - (1/100 + 1/100) = 0.020404...; Ne = 1/(2 Fk') = 24.5
    assert!(report.contains("24.5"), "expected the Pollak point estimate near 24.5:\n{report}");
    assert!(runner.output_file("temporal.tsv").is_file());
    Ok(())
}

#[test]
fn test_monomorphic_population_is_infinite_everywhere() -> Result<()> {
    let mut input = String::from("1 3 99 2\nL1\nL2\nL3\n");
    for _ in 0..10 {
        input.push_str("mono, 0101 0101 0101\n");
    }
    let runner = EstimateRunnerBuilder::new()
        .input(&input)
        .configure(|est| {
            est.ld = true;
            est.het = true;
            est.coan = true;
        })
        .build()?;

    runner.run()?;
    let report = runner.report()?;
    assert!(report.contains("Infinite"));
    // No polymorphic locus: no locus pair may survive enumeration.
    let pairs_lines: Vec<&str> = report.lines().filter(|l| l.contains("Locus pairs")).collect();
    assert!(pairs_lines.iter().all(|l| l.trim_end().ends_with(": 0")));
    Ok(())
}

#[test]
fn test_structural_genotype_error_is_fatal() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input("1 2 99 2\nL1\nL2\npop1, 0101 01x2\n")
        .build()?;
    assert!(runner.run().is_err());
    Ok(())
}

#[test]
fn test_overwrite_protection() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input(FSTAT_FIXTURE)
        .build()?;

    runner.run()?;
    // A second run must refuse to clobber the report.
    assert!(runner.run().is_err());
    Ok(())
}

#[test]
fn test_population_restriction() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input(FSTAT_FIXTURE)
        .configure(|est| {
            est.populations = vec![String::from("2")];
        })
        .build()?;

    runner.run()?;
    let report = runner.report()?;
    assert!(!report.contains("Population north"));
    assert!(report.contains("Population south"));
    Ok(())
}

#[test]
fn test_generation_count_mismatch_is_fatal() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input_name("drift.gen")
        .input(&temporal_fixture())
        .configure(|est| {
            est.generations = vec![0.0, 1.0, 2.0]; // input has 2 samples
        })
        .build()?;
    assert!(runner.run().is_err());
    Ok(())
}

#[test]
fn test_chromosome_grouping_requires_map() -> Result<()> {
    let runner = EstimateRunnerBuilder::new()
        .input(FSTAT_FIXTURE)
        .configure(|est| {
            est.grouping = parser::Grouping::Within;
        })
        .build()?;
    let error = runner.run().unwrap_err();
    assert!(format!("{error}").contains("chromosome-map"));
    Ok(())
}
