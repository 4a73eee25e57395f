//! Diagnostic dump files: per-pair Burrows coefficients, per-locus data and
//! the missing-data report.

use crate::write::generic_writer::GenericWriter;

use estimators::PopulationResult;
use popgene::{LocusSet, PopulationSample};

use std::path::Path;

use anyhow::Result;
use itertools::Itertools;

/// Per-pair Burrows dump of every population × Pcrit that recorded pairs.
///
/// # Errors
/// On write failure.
pub fn burrows_dump(path: impl AsRef<Path>, loci: &LocusSet, results: &[PopulationResult]) -> Result<()> {
    let mut writer = GenericWriter::new(Some(path))?;
    let mut rows = vec![String::from("Population - Pcrit - LocusP - LocusQ - N - MeanR2 - ExpR2 - Drift")];

    for result in results {
        for block in &result.per_pcrit {
            let Some(ld) = &block.ld else { continue };
            for pair in &ld.pair_records {
                rows.push(format!(
                    "{} - {} - {} - {} - {} - {:.6} - {:.6} - {:.6}",
                    result.id,
                    block.pcrit,
                    loci.get()[pair.p as usize].name,
                    loci.get()[pair.q as usize].name,
                    pair.n,
                    pair.r2,
                    pair.exp_r2,
                    pair.r2 - pair.exp_r2,
                ));
            }
        }
    }
    writer.write_iter(rows)
}

/// Per-locus data dump: scored counts and allele frequencies per population.
///
/// # Errors
/// On write failure.
pub fn locus_dump(path: impl AsRef<Path>, loci: &LocusSet, populations: &[PopulationSample]) -> Result<()> {
    let mut writer = GenericWriter::new(Some(path))?;
    let mut rows = vec![String::from("Population - Locus - Scored - Missing - Alleles - Frequencies")];

    for population in populations {
        for locus in loci.iter() {
            let data = population.locus(locus.index);
            let frequencies = data.alleles().iter()
                .map(|allele| format!("{}:{:.4}", allele.mobility, allele.freq))
                .join(" ");
            rows.push(format!(
                "{} - {} - {} - {} - {} - {}",
                population.id(),
                locus.name,
                data.n_scored(),
                data.missing(),
                data.alleles().len(),
                frequencies,
            ));
        }
    }
    writer.write_iter(rows)
}

/// Missing-data report: per population × locus missing counts, loci with
/// none omitted.
///
/// # Errors
/// On write failure.
pub fn missing_report(path: impl AsRef<Path>, loci: &LocusSet, populations: &[PopulationSample]) -> Result<()> {
    let mut writer = GenericWriter::new(Some(path))?;
    let mut rows = vec![String::from("Population - Locus - Missing - Scored")];

    for population in populations {
        let mut total = 0u32;
        for locus in loci.iter() {
            let data = population.locus(locus.index);
            if data.missing() == 0 {
                continue
            }
            total += data.missing();
            rows.push(format!(
                "{} - {} - {} - {}",
                population.id(), locus.name, data.missing(), data.n_scored(),
            ));
        }
        rows.push(format!("{} - total - {} - {}", population.id(), total, population.n()));
    }
    writer.write_iter(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use popgene::Genotype;
    use std::fs;

    fn population() -> (LocusSet, PopulationSample) {
        let loci = LocusSet::new(["L1", "L2"].map(String::from));
        let mut sample = PopulationSample::new("pop1", 2);
        sample.ingest(&[Genotype(1, 2), Genotype(1, 1)]).unwrap();
        sample.ingest(&[Genotype(1, 1), Genotype::MISSING]).unwrap();
        sample.finalize();
        (loci, sample)
    }

    #[test]
    fn locus_dump_lists_every_locus() -> Result<()> {
        let (loci, sample) = population();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("loci.tsv");

        locus_dump(&path, &loci, std::slice::from_ref(&sample))?;
        let written = fs::read_to_string(&path)?;
        assert_eq!(written.lines().count(), 3); // header + 2 loci
        assert!(written.contains("L2"));
        Ok(())
    }

    #[test]
    fn missing_report_skips_complete_loci() -> Result<()> {
        let (loci, sample) = population();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing.tsv");

        missing_report(&path, &loci, std::slice::from_ref(&sample))?;
        let written = fs::read_to_string(&path)?;
        // header + L2 + per-population total; L1 is complete.
        assert_eq!(written.lines().count(), 3);
        assert!(!written.lines().any(|l| l.starts_with("pop1\tL1")));
        assert!(written.contains("L2"));
        Ok(())
    }
}
