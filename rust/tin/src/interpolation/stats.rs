// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Distribution quantiles used for regression prediction intervals.

/// Quantile of the standard normal distribution.
///
/// Abramowitz & Stegun 26.2.23; absolute error below 4.5e-4.
pub fn normal_quantile(p: f64) -> f64 {
    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }
    let q = if p > 0.5 { 1.0 - p } else { p };
    let t = (-2.0 * q.ln()).sqrt();
    let x = t
        - (2.515517 + 0.802853 * t + 0.010328 * t * t)
            / (1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t);
    if p > 0.5 {
        x
    } else {
        -x
    }
}

/// Quantile of Student's t distribution with `dof` degrees of freedom.
///
/// Cornish-Fisher expansion around the normal quantile. Accurate to about
/// 1e-3 for `dof >= 5`, which covers the neighborhood sizes used by the
/// regression.
pub fn student_t_quantile(p: f64, dof: f64) -> f64 {
    let z = normal_quantile(p);
    if !(dof > 0.0) || !z.is_finite() {
        return f64::NAN;
    }
    if dof.is_infinite() {
        return z;
    }
    let z2 = z * z;
    let z3 = z2 * z;
    let z5 = z3 * z2;
    let z7 = z5 * z2;
    let z9 = z7 * z2;
    let g1 = (z3 + z) / 4.0;
    let g2 = (5.0 * z5 + 16.0 * z3 + 3.0 * z) / 96.0;
    let g3 = (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / 384.0;
    let g4 = (79.0 * z9 + 776.0 * z7 + 1482.0 * z5 - 1920.0 * z3 - 945.0 * z) / 92160.0;
    z + g1 / dof + g2 / dof.powi(2) + g3 / dof.powi(3) + g4 / dof.powi(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_quantile_matches_tables() {
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-3);
        assert!((normal_quantile(0.025) + 1.959964).abs() < 1e-3);
        assert!(normal_quantile(0.5).abs() < 1e-3);
        assert!(normal_quantile(1.0).is_nan());
    }

    #[test]
    fn t_quantile_matches_tables() {
        assert!((student_t_quantile(0.975, 10.0) - 2.2281).abs() < 5e-3);
        assert!((student_t_quantile(0.975, 30.0) - 2.0423).abs() < 2e-3);
        assert!((student_t_quantile(0.975, f64::INFINITY) - 1.96).abs() < 1e-3);
    }
}
