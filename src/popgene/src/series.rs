use crate::{PopgeneError, PopulationSample};

use std::fmt::{self, Display, Formatter};

/// Temporal sampling plan.
///
/// Plan I samples after reproduction, from a census of `census` breeding
/// adults (contributes a `1/census` correction term); Plan II samples before
/// reproduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    PlanI { census: u32 },
    PlanII,
}

impl Plan {
    /// Build from the user's census figure: 0 means Plan II.
    #[must_use]
    pub fn from_census(census: u32) -> Plan {
        if census == 0 { Plan::PlanII } else { Plan::PlanI { census } }
    }

    /// The additive sampling-plan correction applied to every F-statistic.
    #[must_use]
    pub fn correction(&self) -> f64 {
        match self {
            Plan::PlanI { census } => 1.0 / f64::from(*census),
            Plan::PlanII           => 0.0,
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Plan::PlanI { census } => write!(f, "Plan I (census {census})"),
            Plan::PlanII           => write!(f, "Plan II"),
        }
    }
}

/// Two or more samples of one population, ordered by strictly increasing
/// generation time, sharing one locus set.
#[derive(Debug)]
pub struct TemporalSeries {
    samples : Vec<PopulationSample>,
    times   : Vec<f64>,
    plan    : Plan,
}

impl TemporalSeries {
    /// # Errors
    /// - `NotEnoughSamples` with fewer than two samples.
    /// - `NonIncreasingTimes` when generation times are not strictly ascending.
    /// - `LocusSetMismatch` when samples disagree on the locus count.
    pub fn new(samples: Vec<PopulationSample>, times: Vec<f64>, plan: Plan) -> Result<TemporalSeries, PopgeneError> {
        if samples.len() < 2 || times.len() != samples.len() {
            return Err(PopgeneError::NotEnoughSamples(samples.len()))
        }
        for window in times.windows(2) {
            if window[1] <= window[0] {
                return Err(PopgeneError::NonIncreasingTimes(window[1], window[0]))
            }
        }
        let locus_count = samples[0].locus_count();
        if let Some(other) = samples.iter().find(|s| s.locus_count() != locus_count) {
            return Err(PopgeneError::LocusSetMismatch(locus_count, other.locus_count()))
        }
        Ok(TemporalSeries { samples, times, plan })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn plan(&self) -> Plan {
        self.plan
    }

    #[must_use]
    pub fn sample(&self, index: usize) -> &PopulationSample {
        &self.samples[index]
    }

    #[must_use]
    pub fn time(&self, index: usize) -> f64 {
        self.times[index]
    }

    /// All ordered sample pairs (a, b) with a < b, together with their
    /// generation gap.
    pub fn sample_pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.samples.len()).flat_map(move |a| {
            ((a + 1)..self.samples.len()).map(move |b| (a, b, self.times[b] - self.times[a]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Genotype;

    fn sample(id: &str, loci: usize) -> PopulationSample {
        let mut s = PopulationSample::new(id, loci);
        s.ingest(&vec![Genotype(1, 2); loci]).unwrap();
        s.ingest(&vec![Genotype(1, 1); loci]).unwrap();
        s.finalize();
        s
    }

    #[test]
    fn pair_enumeration_with_gaps() {
        let series = TemporalSeries::new(
            vec![sample("t0", 1), sample("t1", 1), sample("t2", 1)],
            vec![0.0, 2.0, 5.0],
            Plan::PlanII,
        ).unwrap();
        let pairs: Vec<(usize, usize, f64)> = series.sample_pairs().collect();
        assert_eq!(pairs, vec![(0, 1, 2.0), (0, 2, 5.0), (1, 2, 3.0)]);
    }

    #[test]
    fn rejects_single_sample() {
        let result = TemporalSeries::new(vec![sample("t0", 1)], vec![0.0], Plan::PlanII);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_increasing_times() {
        let result = TemporalSeries::new(
            vec![sample("t0", 1), sample("t1", 1)],
            vec![1.0, 1.0],
            Plan::PlanII,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_locus_set_mismatch() {
        let result = TemporalSeries::new(
            vec![sample("t0", 1), sample("t1", 2)],
            vec![0.0, 1.0],
            Plan::PlanII,
        );
        assert!(result.is_err());
    }

    #[test]
    fn plan_correction_term() {
        assert_eq!(Plan::from_census(0), Plan::PlanII);
        assert_eq!(Plan::from_census(200).correction(), 0.005);
        assert_eq!(Plan::PlanII.correction(), 0.0);
    }
}
