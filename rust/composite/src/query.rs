// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point queries against the selected interpolation source.

use std::fmt::Write;

use tinview_tin::{BandwidthMethod, SurfaceForm};

use crate::model::TinModel;
use crate::selector::InterpolationSource;
use crate::transform::{ViewTransform, VisibleWindow};

/// Significance level of the reported prediction interval (95%).
pub const QUERY_ALPHA: f64 = 0.05;

/// Bandwidth proportion for point queries and hover values.
pub const QUERY_BANDWIDTH: f64 = 1.0;

pub const NOT_AVAILABLE: &str = "Data not available. Model not loaded";

/// First and second derivatives of a fitted quadratic surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDerivatives {
    pub zx: f64,
    pub zy: f64,
    pub zxx: f64,
    pub zyy: f64,
    pub zxy: f64,
}

impl SurfaceDerivatives {
    /// From coefficients ordered `[c, zx, zy, zxx/2, zyy/2, zxy]`.
    pub fn from_coefficients(beta: &[f64; 6]) -> Self {
        Self {
            zx: beta[1],
            zy: beta[2],
            zxx: 2.0 * beta[3],
            zyy: 2.0 * beta[4],
            zxy: beta[5],
        }
    }

    pub fn slope(&self) -> f64 {
        self.zx.hypot(self.zy)
    }

    /// Direction of steepest descent in degrees, counterclockwise from +x.
    pub fn descent_azimuth(&self) -> f64 {
        (-self.zy).atan2(-self.zx).to_degrees()
    }

    /// Direction of steepest descent as a compass bearing in `[0, 360)`.
    pub fn descent_bearing(&self) -> f64 {
        let bearing = 90.0 - self.descent_azimuth();
        if bearing < 0.0 {
            bearing + 360.0
        } else {
            bearing
        }
    }

    /// Profile curvature; NaN on a flat surface.
    pub fn profile_curvature(&self) -> f64 {
        let Self { zx, zy, zxx, zyy, zxy } = *self;
        let g2 = zx * zx + zy * zy;
        let denominator = g2 * (g2 + 1.0).powf(1.5);
        if denominator == 0.0 {
            return f64::NAN;
        }
        (zxx * zx * zx + 2.0 * zxy * zx * zy + zyy * zy * zy) / denominator
    }

    /// Streamline curvature; NaN on a flat surface.
    pub fn streamline_curvature(&self) -> f64 {
        let Self { zx, zy, zxx, zyy, zxy } = *self;
        let denominator = (zx * zx + zy * zy).powf(1.5);
        if denominator == 0.0 {
            return f64::NAN;
        }
        (zx * zy * (zxx - zyy) + (zy * zy - zx * zx) * zxy) / denominator
    }
}

/// The outcome of a point query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub viewport_point: (f64, f64),
    pub model_point: (f64, f64),
    /// Multi-line diagnostic report
    pub text: String,
}

/// Answers queries for viewport positions.
pub struct PointQuery<'a> {
    model: &'a dyn TinModel,
    transform: &'a ViewTransform,
    window: VisibleWindow,
    source: Option<&'a InterpolationSource>,
}

impl<'a> PointQuery<'a> {
    pub fn new(
        model: &'a dyn TinModel,
        transform: &'a ViewTransform,
        window: VisibleWindow,
        source: Option<&'a InterpolationSource>,
    ) -> Self {
        Self {
            model,
            transform,
            window,
            source,
        }
    }

    /// Regression diagnostics at viewport point `(x, y)`.
    pub fn query(&self, x: f64, y: f64) -> QueryResult {
        let (mx, my) = self.transform.viewport_to_model(x, y);
        let result = |text: String| QueryResult {
            viewport_point: (x, y),
            model_point: (mx, my),
            text,
        };

        let Some(source) = self.source else {
            return result(NOT_AVAILABLE.to_string());
        };
        let Some(located) = source.locate(mx, my) else {
            return result(NOT_AVAILABLE.to_string());
        };

        let model = self.model;
        let estimate = source.interpolator().interpolate(
            SurfaceForm::QuadraticWithCrossTerms,
            BandwidthMethod::Adaptive,
            QUERY_BANDWIDTH,
            mx,
            my,
        );

        let mut s = String::with_capacity(512);
        // Writing to a String cannot fail
        let _ = writeln!(s, "Query/Regression Results");
        let _ = writeln!(s, "X:     {}", model.format_x(mx));
        let _ = writeln!(s, "Y:     {}", model.format_y(my));

        let surface = match estimate.surface() {
            Some(surface) if estimate.value().is_finite() => Some(surface),
            _ => None,
        };
        match surface {
            _ if !located.interior => {
                let _ = writeln!(s, "Query point is outside of TIN");
            }
            None => {
                let _ = writeln!(s, "Z:     Not available");
            }
            Some(surface) => {
                let d = SurfaceDerivatives::from_coefficients(surface.coefficients());
                let half_range = surface.prediction_half_range(QUERY_ALPHA);
                let nearest = located.nearest;

                let _ = writeln!(s, "Z:     {:11.2} +/- {:4.2}", estimate.value(), half_range);
                let _ = writeln!(s, "Slope: {:11.2} %", surface.slope() * 100.0);
                let _ = writeln!(s, "Curvature");
                let _ = writeln!(s, "  Profile:    {:8.5} (radian/unit)", d.profile_curvature());
                let _ = writeln!(s, "  Streamline: {:8.5} (radian/unit)", d.streamline_curvature());
                let _ = writeln!(s, "Steepest Descent");
                let _ = writeln!(s, "  Azimuth:    {:4} deg", d.descent_azimuth() as i32);
                let _ = writeln!(s, "  Compass Brg: {:03} deg", d.descent_bearing() as i32);
                let _ = writeln!(s, "Nearest Point");
                let _ = writeln!(s, "  Dist:  {:11.2} units", located.distance);
                let _ = writeln!(s, "  X:     {}", model.format_x(nearest.x));
                let _ = writeln!(s, "  Y:     {}", model.format_y(nearest.y));
                let _ = writeln!(s, "  Z:     {:11.2}", nearest.z);
                let _ = writeln!(s, "  ID:    {:8}", nearest.index);
                let _ = writeln!(s);
                let _ = writeln!(s, "Regression used {} samples", surface.sample_count());
            }
        }

        tracing::trace!(x = mx, y = my, interior = located.interior, "Point query");
        result(s)
    }

    /// Short hover text: model coordinates and, inside the visible window,
    /// the interpolated value.
    pub fn describe(&self, x: f64, y: f64) -> String {
        let (mx, my) = self.transform.viewport_to_model(x, y);
        let mut s = self.model.format_coordinates(mx, my);
        if !self.window.contains(mx, my) {
            return s;
        }
        if let Some(source) = self.source {
            let z = source
                .interpolator()
                .interpolate(
                    SurfaceForm::QuadraticWithCrossTerms,
                    BandwidthMethod::FixedProportional,
                    QUERY_BANDWIDTH,
                    mx,
                    my,
                )
                .value();
            if z.is_nan() {
                s.push_str(" : N/A");
            } else {
                let _ = write!(s, " : {:4.2}", z);
            }
        }
        s
    }
}
