//! Prose main-output writer: one block per population × Pcrit × estimator,
//! with point estimates, both confidence intervals and the run diagnostics.

use crate::write::generic_writer::GenericWriter;

use estimators::result::{fmt_estimate, CiOutcome};
use estimators::{CoanOutcome, HetOutcome, LdOutcome, MatingModel, PopulationResult, TemporalResult};
use popgene::{PcritList, TemporalSeries};

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

fn render_ci(outcome: &CiOutcome) -> String {
    match outcome {
        CiOutcome::Estimated(ci)  => format!("{ci}"),
        CiOutcome::Skipped(note)  => format!("skipped ({note})"),
        CiOutcome::NotRequested   => String::from("-"),
    }
}

/// Writer of the main prose report.
pub struct ReportWriter<'a> {
    sink: GenericWriter<'a>,
}

impl<'a> ReportWriter<'a> {
    /// # Errors
    /// When the output file cannot be created.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<ReportWriter<'a>> {
        Ok(ReportWriter { sink: GenericWriter::new(path)? })
    }

    /// Run header: input name, assumed mating model and critical values.
    ///
    /// # Errors
    /// On write failure.
    pub fn header(&mut self, input: &str, mating: MatingModel, pcrits: &PcritList) -> Result<()> {
        let mut text = String::new();
        let _ = writeln!(text, "Effective population size estimation");
        let _ = writeln!(text, "====================================");
        let _ = writeln!(text, "Input file        : {input}");
        let _ = writeln!(text, "Mating model (LD) : {mating:?}");
        let pcrit_list = pcrits.into_iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        let _ = writeln!(text, "Critical values   : {pcrit_list}");
        let _ = writeln!(text);
        self.sink.write_raw(&text)
    }

    /// One population's single-sample estimates.
    ///
    /// # Errors
    /// On write failure.
    pub fn population(&mut self, result: &PopulationResult) -> Result<()> {
        let mut text = String::new();
        let _ = writeln!(text, "Population {} ({} individuals{})",
            result.id, result.n,
            if result.has_missing { ", missing data present" } else { "" });
        let _ = writeln!(text, "{}", "-".repeat(60));

        for block in &result.per_pcrit {
            let _ = writeln!(text, "  Lowest allele frequency used: {}", block.pcrit);
            if let Some(ld) = &block.ld {
                Self::ld_block(&mut text, ld);
            }
            if let Some(het) = &block.het {
                Self::het_block(&mut text, het);
            }
        }
        if let Some(coan) = &result.coan {
            Self::coan_block(&mut text, coan);
        }
        let _ = writeln!(text);
        self.sink.write_raw(&text)
    }

    fn ld_block(text: &mut String, ld: &LdOutcome) {
        let _ = writeln!(text, "    Linkage disequilibrium");
        let _ = writeln!(text, "      Locus pairs               : {}", ld.pairs_used);
        let _ = writeln!(text, "      Independent comparisons   : {:.0}", ld.independent_comparisons);
        match ld.harmonic_n {
            Some(n) => { let _ = writeln!(text, "      Harmonic mean sample size : {n:.2}"); }
            None    => { let _ = writeln!(text, "      Harmonic mean sample size : -"); }
        }
        let _ = writeln!(text, "      Mean r^2                  : {:.6}", ld.mean_r2);
        let _ = writeln!(text, "      Expected r^2 (sample)     : {:.6}", ld.expected_r2);
        let _ = writeln!(text, "      r^2 drift component       : {:.6}", ld.r2_drift);
        let _ = writeln!(text, "      Ne estimate               : {}", fmt_estimate(ld.estimate.ne));
        let _ = writeln!(text, "      Parametric 95% CI         : {}", render_ci(&ld.estimate.parametric));
        let _ = writeln!(text, "      Jackknife  95% CI         : {}", render_ci(&ld.estimate.jackknife));
    }

    fn het_block(text: &mut String, het: &HetOutcome) {
        let _ = writeln!(text, "    Heterozygote excess");
        let _ = writeln!(text, "      Loci used                 : {}", het.loci_used);
        let _ = writeln!(text, "      Weighted mean D           : {:.6}", het.d_mean);
        match het.std_error {
            Some(se) => { let _ = writeln!(text, "      Standard error of D       : {se:.6}"); }
            None     => { let _ = writeln!(text, "      Standard error of D       : -"); }
        }
        let _ = writeln!(text, "      Nb estimate               : {}", fmt_estimate(het.estimate.ne));
        let _ = writeln!(text, "      Parametric 95% CI         : {}", render_ci(&het.estimate.parametric));
    }

    fn coan_block(text: &mut String, coan: &CoanOutcome) {
        let _ = writeln!(text, "    Molecular coancestry");
        let _ = writeln!(text, "      Loci used                 : {}", coan.loci_used);
        let _ = writeln!(text, "      Putative non-sib pairs    : {}", coan.nonsib_pairs);
        let _ = writeln!(text, "      Coancestry f1             : {:.6}", coan.f1);
        let _ = writeln!(text, "      Nb estimate               : {}", fmt_estimate(coan.estimate.ne));
        let _ = writeln!(text, "      Jackknife 95% CI          : {}", render_ci(&coan.estimate.jackknife));
    }

    /// Temporal estimates of one series.
    ///
    /// # Errors
    /// On write failure.
    pub fn temporal(&mut self, series: &TemporalSeries, result: &TemporalResult) -> Result<()> {
        let mut text = String::new();
        let _ = writeln!(text, "Temporal series ({} samples, {})", series.len(), series.plan());
        let _ = writeln!(text, "{}", "-".repeat(60));

        for (pcrit, outcomes) in &result.per_pcrit {
            let _ = writeln!(text, "  Lowest allele frequency used: {pcrit}");
            for outcome in outcomes {
                let (a, b) = outcome.pair;
                let _ = writeln!(text, "    {} over samples {} -> {} (generations {} -> {})",
                    outcome.flavor.label(),
                    series.sample(a).id(), series.sample(b).id(),
                    series.time(a), series.time(b));
                let _ = writeln!(text, "      Loci used                 : {}", outcome.loci_used);
                let _ = writeln!(text, "      F (raw)                   : {:.6}", outcome.f_raw);
                let _ = writeln!(text, "      F' (bias corrected)       : {:.6}", outcome.f_prime);
                let _ = writeln!(text, "      Ne estimate               : {}", fmt_estimate(outcome.estimate.ne));
                let _ = writeln!(text, "      Parametric 95% CI         : {}", render_ci(&outcome.estimate.parametric));
                let _ = writeln!(text, "      Jackknife  95% CI         : {}", render_ci(&outcome.estimate.jackknife));
            }
        }
        let _ = writeln!(text);
        self.sink.write_raw(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimators::{Ci, NeEstimate};

    #[test]
    fn ci_rendering() {
        let estimated = CiOutcome::Estimated(Ci::new(Some(12.3), None));
        assert_eq!(render_ci(&estimated), "[12.3 ; Infinite]");
        assert_eq!(render_ci(&CiOutcome::skipped("fewer than 3 individuals")), "skipped (fewer than 3 individuals)");
        assert_eq!(render_ci(&CiOutcome::NotRequested), "-");
    }

    #[test]
    fn infinite_estimates_render_as_literal() {
        let estimate = NeEstimate::infinite();
        assert_eq!(fmt_estimate(estimate.ne), "Infinite");
    }
}
