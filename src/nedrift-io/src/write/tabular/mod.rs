//! Per-estimator tabular output: one row per population × Pcrit (× flavor
//! for the temporal estimators), either tab-delimited or fixed-column.

use crate::write::generic_writer::GenericWriter;

use estimators::result::{sentinel_value, CiOutcome};
use estimators::{PopulationResult, TemporalResult};
use popgene::TemporalSeries;

use std::path::Path;

use anyhow::Result;

const COLUMN_WIDTH: usize = 14;

/// Writer of the per-estimator tables.
pub struct TabularWriter<'a> {
    sink          : GenericWriter<'a>,
    tab_delimited : bool,
}

impl<'a> TabularWriter<'a> {
    /// # Errors
    /// When the output file cannot be created.
    pub fn new(path: Option<impl AsRef<Path>>, tab_delimited: bool) -> Result<TabularWriter<'a>> {
        Ok(TabularWriter { sink: GenericWriter::new(path)?, tab_delimited })
    }

    fn row(&self, fields: &[String]) -> String {
        if self.tab_delimited {
            fields.join("\t")
        } else {
            fields.iter().map(|f| format!("{f: <COLUMN_WIDTH$}")).collect::<Vec<_>>().concat()
        }
    }

    fn ci_fields(outcome: &CiOutcome) -> [String; 2] {
        match outcome {
            CiOutcome::Estimated(ci) => [
                format!("{:.1}", sentinel_value(ci.low)),
                format!("{:.1}", sentinel_value(ci.high)),
            ],
            _ => [String::from("NA"), String::from("NA")],
        }
    }

    /// LD table over all populations.
    ///
    /// # Errors
    /// On write failure.
    pub fn write_ld(&mut self, results: &[PopulationResult]) -> Result<()> {
        let mut rows = vec![self.row(&[
            "Population", "Pcrit", "N", "HarmMeanN", "Pairs", "IndepComp", "MeanR2", "ExpR2", "Ne", "ParamLow", "ParamHigh", "JackLow", "JackHigh",
        ].map(String::from))];

        for result in results {
            for block in &result.per_pcrit {
                let Some(ld) = &block.ld else { continue };
                let [param_low, param_high] = Self::ci_fields(&ld.estimate.parametric);
                let [jack_low, jack_high]   = Self::ci_fields(&ld.estimate.jackknife);
                rows.push(self.row(&[
                    result.id.clone(),
                    block.pcrit.to_string(),
                    result.n.to_string(),
                    ld.harmonic_n.map_or_else(|| String::from("NA"), |n| format!("{n:.2}")),
                    ld.pairs_used.to_string(),
                    format!("{:.0}", ld.independent_comparisons),
                    format!("{:.6}", ld.mean_r2),
                    format!("{:.6}", ld.expected_r2),
                    format!("{:.1}", sentinel_value(ld.estimate.ne)),
                    param_low, param_high, jack_low, jack_high,
                ]));
            }
        }
        self.sink.write_iter(rows)
    }

    /// Heterozygote-excess table over all populations.
    ///
    /// # Errors
    /// On write failure.
    pub fn write_het(&mut self, results: &[PopulationResult]) -> Result<()> {
        let mut rows = vec![self.row(&[
            "Population", "Pcrit", "N", "Loci", "MeanD", "SE(D)", "Nb", "ParamLow", "ParamHigh",
        ].map(String::from))];

        for result in results {
            for block in &result.per_pcrit {
                let Some(het) = &block.het else { continue };
                let [param_low, param_high] = Self::ci_fields(&het.estimate.parametric);
                rows.push(self.row(&[
                    result.id.clone(),
                    block.pcrit.to_string(),
                    result.n.to_string(),
                    het.loci_used.to_string(),
                    format!("{:.6}", het.d_mean),
                    het.std_error.map_or_else(|| String::from("NA"), |se| format!("{se:.6}")),
                    format!("{:.1}", sentinel_value(het.estimate.ne)),
                    param_low, param_high,
                ]));
            }
        }
        self.sink.write_iter(rows)
    }

    /// Molecular-coancestry table over all populations.
    ///
    /// # Errors
    /// On write failure.
    pub fn write_coan(&mut self, results: &[PopulationResult]) -> Result<()> {
        let mut rows = vec![self.row(&[
            "Population", "N", "NonSibPairs", "Loci", "f1", "Nb", "JackLow", "JackHigh",
        ].map(String::from))];

        for result in results {
            let Some(coan) = &result.coan else { continue };
            let [jack_low, jack_high] = Self::ci_fields(&coan.estimate.jackknife);
            rows.push(self.row(&[
                result.id.clone(),
                result.n.to_string(),
                coan.nonsib_pairs.to_string(),
                coan.loci_used.to_string(),
                format!("{:.6}", coan.f1),
                format!("{:.1}", sentinel_value(coan.estimate.ne)),
                jack_low, jack_high,
            ]));
        }
        self.sink.write_iter(rows)
    }

    /// Temporal table over one series.
    ///
    /// # Errors
    /// On write failure.
    pub fn write_temporal(&mut self, series: &TemporalSeries, result: &TemporalResult) -> Result<()> {
        let mut rows = vec![self.row(&[
            "Pcrit", "Method", "SampleA", "SampleB", "Gap", "Loci", "F", "Fprime", "Ne", "ParamLow", "ParamHigh", "JackLow", "JackHigh",
        ].map(String::from))];

        for (pcrit, outcomes) in &result.per_pcrit {
            for outcome in outcomes {
                let (a, b) = outcome.pair;
                let [param_low, param_high] = Self::ci_fields(&outcome.estimate.parametric);
                let [jack_low, jack_high]   = Self::ci_fields(&outcome.estimate.jackknife);
                rows.push(self.row(&[
                    pcrit.to_string(),
                    outcome.flavor.label().to_string(),
                    series.sample(a).id().to_string(),
                    series.sample(b).id().to_string(),
                    format!("{}", outcome.gap),
                    outcome.loci_used.to_string(),
                    format!("{:.6}", outcome.f_raw),
                    format!("{:.6}", outcome.f_prime),
                    format!("{:.1}", sentinel_value(outcome.estimate.ne)),
                    param_low, param_high, jack_low, jack_high,
                ]));
            }
        }
        self.sink.write_iter(rows)
    }
}
