use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::MIN_FIT_SAMPLES;
use crate::error::{FretError, Result};

use super::distribution::two_sided_p_value;

/// Ordinary least-squares fit `y = slope * x + intercept` with t-test
/// p-values for both parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Number of (x, y) samples.
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub slope_stderr: f64,
    pub intercept_stderr: f64,
    /// Pearson correlation coefficient.
    pub r: f64,
    /// Two-sided p-value of slope = 0.
    pub slope_p: f64,
    /// Two-sided p-value of intercept = 0.
    pub intercept_p: f64,
}

impl LinearFit {
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }
}

/// Least-squares regression of `y` on `x`.
///
/// Moments are population moments; standard errors use `n - 2` degrees of
/// freedom and both p-values test `estimate / stderr` against a two-sided
/// Student t distribution with `n - 2` degrees of freedom.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(FretError::Pipeline(format!(
            "regression inputs differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < MIN_FIT_SAMPLES {
        return Err(FretError::InsufficientSamples {
            needed: MIN_FIT_SAMPLES,
            found: n,
        });
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;

    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }
    ssxm /= nf;
    ssym /= nf;
    ssxym /= nf;

    if ssxm == 0.0 {
        return Err(FretError::DegenerateFit(
            "all x values are identical".to_string(),
        ));
    }

    let r = if ssym == 0.0 {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;
    let df = (n - 2) as f64;

    let slope_stderr = ((1.0 - r * r).max(0.0) * ssym / ssxm / df).sqrt();
    let intercept_stderr = slope_stderr * (ssxm + x_mean * x_mean).sqrt();

    let fit = LinearFit {
        n,
        slope,
        intercept,
        slope_stderr,
        intercept_stderr,
        r,
        slope_p: two_sided_p_value(slope, slope_stderr, df),
        intercept_p: two_sided_p_value(intercept, intercept_stderr, df),
    };
    debug!(
        n,
        slope = fit.slope,
        intercept = fit.intercept,
        r2 = fit.r_squared(),
        "Linear fit"
    );
    Ok(fit)
}
