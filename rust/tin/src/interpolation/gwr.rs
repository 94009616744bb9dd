// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geographically weighted regression over TIN neighborhoods.
//!
//! Each query fits a low-order polynomial surface to the samples around the
//! query point by weighted least squares. Coordinates are centered on the
//! query, so the constant coefficient is the interpolated value and the
//! linear coefficients are the first partial derivatives there.
//!
//! Weights follow a Gaussian kernel `w = exp(-d² / 2h²)`. The bandwidth `h`
//! is either a fixed proportion of the mean sample distance, or chosen from
//! a set of candidate proportions by minimizing the corrected Akaike
//! information criterion (AICc).

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use super::stats::student_t_quantile;
use crate::tin::Tin;
use crate::vertex::Vertex;

/// Neighborhood growth limit, in adjacency rings.
const MAX_RINGS: usize = 4;

/// Bandwidth proportions tried by the adaptive method.
const ADAPTIVE_PROPORTIONS: [f64; 7] = [0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0];

/// Polynomial form of the local surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceForm {
    /// `z = c + zx·dx + zy·dy`
    Planar,
    /// `z = c + zx·dx + zy·dy + a·dx² + b·dy² + zxy·dx·dy`
    QuadraticWithCrossTerms,
}

impl SurfaceForm {
    pub fn coefficient_count(self) -> usize {
        match self {
            SurfaceForm::Planar => 3,
            SurfaceForm::QuadraticWithCrossTerms => 6,
        }
    }

    fn terms(self, dx: f64, dy: f64) -> [f64; 6] {
        [1.0, dx, dy, dx * dx, dy * dy, dx * dy]
    }
}

/// How the kernel bandwidth is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthMethod {
    /// Bandwidth is `param` times the mean distance to the samples.
    FixedProportional,
    /// Bandwidth is picked per query by minimum AICc, scanning candidate
    /// proportions scaled by `param`.
    Adaptive,
}

/// A fitted local surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionSurface {
    coefficients: [f64; 6],
    sample_count: usize,
    bandwidth: f64,
    residual_variance: f64,
    intercept_variance_factor: f64,
    effective_dof: f64,
    aicc: f64,
}

impl RegressionSurface {
    /// Coefficients ordered `[c, zx, zy, zxx/2, zyy/2, zxy]`. Terms the
    /// surface form does not fit are zero.
    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }

    pub fn value(&self) -> f64 {
        self.coefficients[0]
    }

    /// Number of samples that took part in the fit.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Estimated variance of the observation error.
    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// Residual degrees of freedom (`n - tr(S)`).
    pub fn effective_dof(&self) -> f64 {
        self.effective_dof
    }

    /// Gradient magnitude, rise over run.
    pub fn slope(&self) -> f64 {
        self.coefficients[1].hypot(self.coefficients[2])
    }

    /// Half width of the `1 - alpha` prediction interval for a new
    /// observation at the query point.
    pub fn prediction_half_range(&self, alpha: f64) -> f64 {
        let t = student_t_quantile(1.0 - alpha / 2.0, self.effective_dof);
        t * (self.residual_variance * (1.0 + self.intercept_variance_factor)).sqrt()
    }
}

/// Outcome of a single regression query.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    value: f64,
    exterior: bool,
    surface: Option<RegressionSurface>,
}

impl Estimate {
    fn undefined(exterior: bool) -> Self {
        Self {
            value: f64::NAN,
            exterior,
            surface: None,
        }
    }

    /// Interpolated value, NaN when no surface could be fitted.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the query lay outside the triangulated area. The value is
    /// then an extrapolation.
    pub fn was_exterior(&self) -> bool {
        self.exterior
    }

    pub fn surface(&self) -> Option<&RegressionSurface> {
        self.surface.as_ref()
    }
}

/// Local weighted regression interpolator bound to one TIN.
#[derive(Debug, Clone)]
pub struct GwrInterpolator {
    tin: Arc<Tin>,
}

impl GwrInterpolator {
    pub fn new(tin: Arc<Tin>) -> Self {
        Self { tin }
    }

    pub fn tin(&self) -> &Arc<Tin> {
        &self.tin
    }

    /// Fit a local surface at `(x, y)`.
    pub fn interpolate(
        &self,
        form: SurfaceForm,
        method: BandwidthMethod,
        param: f64,
        x: f64,
        y: f64,
    ) -> Estimate {
        let exterior = !self.tin.is_interior(x, y);
        let k = form.coefficient_count();
        let samples = self.tin.neighborhood(x, y, 2 * k + 1, MAX_RINGS);
        if samples.len() <= k {
            return Estimate::undefined(exterior);
        }

        let mean_distance =
            samples.iter().map(|s| s.distance_xy(x, y)).sum::<f64>() / samples.len() as f64;

        let surface = match method {
            BandwidthMethod::FixedProportional => fit(&samples, x, y, form, param * mean_distance),
            BandwidthMethod::Adaptive => ADAPTIVE_PROPORTIONS
                .iter()
                .filter_map(|p| fit(&samples, x, y, form, p * param * mean_distance))
                .min_by(|a, b| a.aicc.total_cmp(&b.aicc)),
        };

        match surface {
            Some(surface) => Estimate {
                value: surface.value(),
                exterior,
                surface: Some(surface),
            },
            None => Estimate::undefined(exterior),
        }
    }
}

/// Weighted least squares fit centered on `(x, y)`.
fn fit(
    samples: &[Vertex],
    x: f64,
    y: f64,
    form: SurfaceForm,
    bandwidth: f64,
) -> Option<RegressionSurface> {
    if !(bandwidth > 0.0 && bandwidth.is_finite()) {
        return None;
    }

    let n = samples.len();
    let k = form.coefficient_count();
    let mut design = DMatrix::<f64>::zeros(n, k);
    let mut weights = DVector::<f64>::zeros(n);
    let mut z = DVector::<f64>::zeros(n);
    let h2 = bandwidth * bandwidth;

    for (i, s) in samples.iter().enumerate() {
        let dx = s.x - x;
        let dy = s.y - y;
        let terms = form.terms(dx, dy);
        for j in 0..k {
            design[(i, j)] = terms[j];
        }
        weights[i] = (-0.5 * (dx * dx + dy * dy) / h2).exp();
        z[i] = s.z;
    }

    // X'W, scaled column by column
    let mut xtw = design.transpose();
    for i in 0..n {
        for j in 0..k {
            xtw[(j, i)] *= weights[i];
        }
    }

    let inverse = (&xtw * &design).try_inverse()?;
    let projection = &inverse * &xtw;
    let beta = &projection * &z;
    if beta.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let fitted = &design * &beta;
    let mut weighted_rss = 0.0;
    let mut weight_sum = 0.0;
    for i in 0..n {
        let r = z[i] - fitted[i];
        weighted_rss += weights[i] * r * r;
        weight_sum += weights[i];
    }
    if !(weight_sum > 0.0) {
        return None;
    }

    let trace = (&design * &projection).trace();
    let nf = n as f64;
    let effective_dof = (nf - trace).max(1.0);
    let mean_square = weighted_rss / weight_sum;
    let residual_variance = mean_square * nf / effective_dof;
    let intercept_variance_factor = (&projection * projection.transpose())[(0, 0)];

    let aicc = if nf - 2.0 - trace > 0.0 {
        nf * mean_square.ln() + nf * (nf + trace) / (nf - 2.0 - trace)
    } else {
        f64::INFINITY
    };

    let mut coefficients = [0.0; 6];
    coefficients[..k].copy_from_slice(beta.as_slice());

    Some(RegressionSurface {
        coefficients,
        sample_count: n,
        bandwidth,
        residual_variance,
        intercept_variance_factor,
        effective_dof,
        aicc,
    })
}
