use crate::config::INFINITE_SENTINEL;

use std::fmt::{self, Display, Formatter};

/// A 95% confidence interval on an Ne/Nb scale. `None` bounds are infinite.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ci {
    pub low  : Option<f64>,
    pub high : Option<f64>,
}

impl Ci {
    #[must_use]
    pub fn new(low: Option<f64>, high: Option<f64>) -> Ci {
        Ci { low, high }
    }

    /// Widen `self` to cover `other` (the CI-merging switch).
    #[must_use]
    pub fn union(&self, other: &Ci) -> Ci {
        let low = match (self.low, other.low) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b)             => a.or(b), // an absent bound here means "not computed"; keep the other
        };
        let high = match (self.high, other.high) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _                  => None, // an absent high bound is infinite; the union is too
        };
        Ci { low, high }
    }
}

impl Display for Ci {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{} ; {}]", fmt_estimate(self.low), fmt_estimate(self.high))
    }
}

/// What became of one requested confidence interval.
#[derive(Debug, Clone, PartialEq)]
pub enum CiOutcome {
    Estimated(Ci),
    /// The CI could not be computed; carries a short diagnostic note.
    Skipped(String),
    NotRequested,
}

impl CiOutcome {
    pub fn skipped(note: impl Into<String>) -> CiOutcome {
        CiOutcome::Skipped(note.into())
    }

    #[must_use]
    pub fn ci(&self) -> Option<&Ci> {
        match self {
            CiOutcome::Estimated(ci) => Some(ci),
            _ => None,
        }
    }
}

/// One point estimate with its two confidence intervals.
/// `ne: None` encodes an infinite estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct NeEstimate {
    pub ne         : Option<f64>,
    pub parametric : CiOutcome,
    pub jackknife  : CiOutcome,
}

impl NeEstimate {
    #[must_use]
    pub fn infinite() -> NeEstimate {
        NeEstimate {
            ne         : None,
            parametric : CiOutcome::skipped("no eligible data"),
            jackknife  : CiOutcome::skipped("no eligible data"),
        }
    }

    /// Apply the CI-merging switch: widen the parametric CI by the jackknife
    /// CI when both were estimated.
    pub fn merge_cis(&mut self) {
        if let (CiOutcome::Estimated(param), CiOutcome::Estimated(jack)) = (&self.parametric, &self.jackknife) {
            self.parametric = CiOutcome::Estimated(param.union(jack));
        }
    }
}

/// Render an estimate for output files: finite values as themselves, ∞ as
/// the literal `Infinite` (numeric consumers receive the 1e10 sentinel via
/// [`sentinel_value`]).
#[must_use]
pub fn fmt_estimate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None    => String::from("Infinite"),
    }
}

/// Numeric encoding of an estimate for tabular output.
#[must_use]
pub fn sentinel_value(value: Option<f64>) -> f64 {
    value.unwrap_or(INFINITE_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_rendering() {
        assert_eq!(fmt_estimate(None), "Infinite");
        assert_eq!(fmt_estimate(Some(24.5)), "24.5");
        assert_eq!(sentinel_value(None), INFINITE_SENTINEL);
    }

    #[test]
    fn ci_union_widens() {
        let a = Ci::new(Some(10.0), Some(50.0));
        let b = Ci::new(Some(5.0), Some(40.0));
        assert_eq!(a.union(&b), Ci::new(Some(5.0), Some(50.0)));
    }

    #[test]
    fn ci_union_with_infinite_high() {
        let a = Ci::new(Some(10.0), Some(50.0));
        let b = Ci::new(Some(20.0), None);
        assert_eq!(a.union(&b), Ci::new(Some(10.0), None));
    }

    #[test]
    fn merge_is_a_no_op_when_jackknife_skipped() {
        let mut estimate = NeEstimate {
            ne         : Some(100.0),
            parametric : CiOutcome::Estimated(Ci::new(Some(50.0), Some(200.0))),
            jackknife  : CiOutcome::skipped("fewer than 3 individuals"),
        };
        estimate.merge_cis();
        assert_eq!(estimate.parametric.ci(), Some(&Ci::new(Some(50.0), Some(200.0))));
    }
}
