//! Shared numeric toolkit for the estimation engines: 95% critical values of
//! the chi-square and Student-t distributions, the jackknife
//! degrees-of-freedom rule, and harmonic means.

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

mod error;
pub use error::NumericError;

use anyhow::Result;

/// Two-sided 95% confidence level: quantiles taken at 2.5% / 97.5%.
const LOWER_TAIL: f64 = 0.025;
const UPPER_TAIL: f64 = 0.975;

/// Chi-square critical values `(upper, lower)` at 95% confidence for `df`
/// degrees of freedom, i.e. the 97.5% and 2.5% quantiles.
///
/// # Errors
/// [`NumericError::InvalidDf`] when `df` is zero or not finite.
pub fn chi2_bounds(df: f64) -> Result<(f64, f64), NumericError> {
    if !df.is_finite() || df < 1.0 {
        return Err(NumericError::InvalidDf(df));
    }
    let chi2 = ChiSquared::new(df).map_err(|_| NumericError::InvalidDf(df))?;
    Ok((chi2.inverse_cdf(UPPER_TAIL), chi2.inverse_cdf(LOWER_TAIL)))
}

/// 95% confidence interval of a chi-square distributed mean statistic:
/// `estimate * df` is treated as a chi-square draw with `df` degrees of
/// freedom, giving `[estimate·df/χ²(97.5%), estimate·df/χ²(2.5%)]`.
pub fn chi2_ci(estimate: f64, df: f64) -> Result<(f64, f64), NumericError> {
    let (upper_crit, lower_crit) = chi2_bounds(df)?;
    Ok((estimate * df / upper_crit, estimate * df / lower_crit))
}

/// Student-t 97.5% critical value for `df` degrees of freedom.
///
/// # Errors
/// [`NumericError::InvalidDf`] when `df` is zero or not finite.
pub fn student_t975(df: f64) -> Result<f64, NumericError> {
    if !df.is_finite() || df < 1.0 {
        return Err(NumericError::InvalidDf(df));
    }
    let t = StudentsT::new(0.0, 1.0, df).map_err(|_| NumericError::InvalidDf(df))?;
    Ok(t.inverse_cdf(UPPER_TAIL))
}

/// Effective degrees of freedom of a jackknife variance estimate.
///
/// A mean statistic distributed as a scaled chi-square with `df` degrees of
/// freedom has variance `2·mean²/df`; inverting gives `df = 2·mean²/var`.
/// The result is rounded and floored at 1.
#[must_use]
pub fn jackknife_df(mean: f64, variance: f64) -> Option<f64> {
    if variance <= 0.0 || !variance.is_finite() {
        return None
    }
    Some((2.0 * mean * mean / variance).round().max(1.0))
}

/// Unweighted harmonic mean. Returns `None` on an empty or non-positive input.
#[must_use]
pub fn harmonic_mean(values: &[f64]) -> Option<f64> {
    weighted_harmonic_mean(values.iter().map(|&v| (v, 1.0)))
}

/// Harmonic mean of `(value, weight)` pairs: `Σw / Σ(w/v)`.
/// Returns `None` when no pair has a positive value and weight.
pub fn weighted_harmonic_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    let mut sum_w     = 0.0;
    let mut sum_w_inv = 0.0;
    for (value, weight) in pairs {
        if value <= 0.0 || weight <= 0.0 {
            continue
        }
        sum_w     += weight;
        sum_w_inv += weight / value;
    }
    (sum_w_inv > 0.0).then(|| sum_w / sum_w_inv)
}

/// Variance of leave-one-out estimates around their mean:
/// `(n-1)/n · Σ(xᵢ - x̄)²`. Returns `None` for fewer than two values.
#[must_use]
pub fn jackknife_variance(leave_one_out: &[f64]) -> Option<f64> {
    let n = leave_one_out.len();
    if n < 2 {
        return None
    }
    let n_f  = n as f64;
    let mean = leave_one_out.iter().sum::<f64>() / n_f;
    let ssq  = leave_one_out.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>();
    Some(ssq * (n_f - 1.0) / n_f)
}
