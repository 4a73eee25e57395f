//! Per-population orchestration: build the eligibility map for every Pcrit,
//! run the enabled estimators, and collect their outcomes. Structural errors
//! propagate; numerical degeneracies come back as ∞/NA inside the outcomes.

use crate::coan::{CoanEngine, CoanOutcome};
use crate::config::EstimatorConfig;
use crate::het::{HetEngine, HetOutcome};
use crate::ld::{LdEngine, LdOutcome};
use crate::temporal::{TempEngine, TempOutcome};

use popgene::{EligibilityMap, LocusSet, Pcrit, PcritList, PopulationSample, TemporalSeries};

use anyhow::Result;
use located_error::LocatedError;
use log::info;

/// Single-sample estimates of one population at one Pcrit.
#[derive(Debug)]
pub struct PcritBlock {
    pub pcrit : Pcrit,
    pub ld    : Option<LdOutcome>,
    pub het   : Option<HetOutcome>,
}

/// All single-sample estimates of one population.
#[derive(Debug)]
pub struct PopulationResult {
    pub id          : String,
    pub n           : usize,
    pub has_missing : bool,
    pub per_pcrit   : Vec<PcritBlock>,
    /// The coancestry estimator ignores the frequency filter and runs once.
    pub coan        : Option<CoanOutcome>,
}

/// All temporal estimates of one series, one entry per Pcrit.
#[derive(Debug)]
pub struct TemporalResult {
    pub per_pcrit : Vec<(Pcrit, Vec<TempOutcome>)>,
}

/// Runs the enabled estimators over populations and series.
pub struct Controller<'a> {
    loci   : &'a LocusSet,
    pcrits : &'a PcritList,
    config : &'a EstimatorConfig,
}

impl<'a> Controller<'a> {
    #[must_use]
    pub fn new(loci: &'a LocusSet, pcrits: &'a PcritList, config: &'a EstimatorConfig) -> Controller<'a> {
        Controller { loci, pcrits, config }
    }

    /// Run the single-sample estimators (LD, heterozygote excess,
    /// coancestry) over one population at every Pcrit.
    pub fn run_population(&self, sample: &PopulationSample) -> Result<PopulationResult> {
        info!("Population {}: {} individuals, {} loci", sample.id(), sample.n(), sample.locus_count());

        let mut per_pcrit = Vec::with_capacity(self.pcrits.len());
        for &pcrit in self.pcrits {
            let elig = EligibilityMap::build(self.loci, sample, pcrit);

            let ld = if self.config.methods.ld {
                Some(LdEngine::new(sample, self.loci, &elig, self.config).run()
                    .with_loc(|| format!("While running the LD engine on population {} at Pcrit {pcrit}", sample.id()))?)
            } else {
                None
            };

            let het = self.config.methods.het
                .then(|| HetEngine::new(sample, &elig, self.config).run());

            per_pcrit.push(PcritBlock { pcrit, ld, het });
        }

        let coan = self.config.methods.coan
            .then(|| CoanEngine::new(sample, self.loci, self.config).run());

        Ok(PopulationResult {
            id          : sample.id().to_string(),
            n           : sample.n(),
            has_missing : sample.has_missing(),
            per_pcrit,
            coan,
        })
    }

    /// Run the temporal estimators over one series at every Pcrit.
    #[must_use]
    pub fn run_series(&self, series: &TemporalSeries) -> TemporalResult {
        let per_pcrit = self.pcrits.into_iter()
            .map(|&pcrit| (pcrit, TempEngine::new(series, self.loci, pcrit, self.config).run()))
            .collect();
        TemporalResult { per_pcrit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Methods;
    use crate::result::CiOutcome;
    use popgene::{Genotype, Plan};

    fn monomorphic_sample(id: &str) -> PopulationSample {
        let mut sample = PopulationSample::new(id, 3);
        for _ in 0..10 {
            sample.ingest(&[Genotype(1, 1), Genotype(1, 1), Genotype(1, 1)]).unwrap();
        }
        sample.finalize();
        sample
    }

    fn controller_config() -> EstimatorConfig {
        EstimatorConfig {
            methods: Methods { ld: true, het: true, coan: true, temporal: true },
            ..EstimatorConfig::default()
        }
    }

    #[test]
    fn monomorphic_population_reports_infinite_everywhere() -> Result<()> {
        // S2: every estimator must come back ∞ at every Pcrit, without error.
        let loci    = LocusSet::new(["L0", "L1", "L2"].map(String::from));
        let pcrits  = PcritList::parse(&[0.05, 0.02]).unwrap();
        let config  = controller_config();
        let sample  = monomorphic_sample("mono");

        let result = Controller::new(&loci, &pcrits, &config).run_population(&sample)?;
        assert_eq!(result.per_pcrit.len(), 3); // 0.05, 0.02 + appended 0

        for block in &result.per_pcrit {
            let ld = block.ld.as_ref().unwrap();
            assert_eq!(ld.estimate.ne, None);
            assert_eq!(ld.pairs_used, 0);
            assert!(matches!(ld.estimate.jackknife, CiOutcome::Skipped(_)));

            let het = block.het.as_ref().unwrap();
            assert_eq!(het.estimate.ne, None);
        }
        assert_eq!(result.coan.as_ref().unwrap().estimate.ne, None);
        Ok(())
    }

    #[test]
    fn disabled_methods_stay_empty() -> Result<()> {
        let loci    = LocusSet::new(["L0", "L1", "L2"].map(String::from));
        let pcrits  = PcritList::parse(&[]).unwrap();
        let config  = EstimatorConfig {
            methods: Methods { ld: false, het: true, coan: false, temporal: false },
            ..EstimatorConfig::default()
        };
        let sample = monomorphic_sample("mono");

        let result = Controller::new(&loci, &pcrits, &config).run_population(&sample)?;
        assert!(result.per_pcrit[0].ld.is_none());
        assert!(result.per_pcrit[0].het.is_some());
        assert!(result.coan.is_none());
        Ok(())
    }

    #[test]
    fn series_runs_at_every_pcrit() {
        let make_sample = |freq1: usize, id: &str| {
            let mut sample = PopulationSample::new(id, 1);
            let mut remaining = freq1;
            for _ in 0..20 {
                let g = match remaining {
                    0 => Genotype(2, 2),
                    1 => { remaining = 0; Genotype(1, 2) }
                    _ => { remaining -= 2; Genotype(1, 1) }
                };
                sample.ingest(&[g]).unwrap();
            }
            sample.finalize();
            sample
        };
        let series = TemporalSeries::new(
            vec![make_sample(20, "t0"), make_sample(26, "t1")],
            vec![0.0, 2.0],
            Plan::PlanII,
        ).unwrap();

        let loci   = LocusSet::new(["L0".to_string()]);
        let pcrits = PcritList::parse(&[0.02]).unwrap();
        let config = controller_config();

        let result = Controller::new(&loci, &pcrits, &config).run_series(&series);
        assert_eq!(result.per_pcrit.len(), 2);
        for (_, outcomes) in &result.per_pcrit {
            assert_eq!(outcomes.len(), 3); // one pair × three flavors
        }
    }
}
