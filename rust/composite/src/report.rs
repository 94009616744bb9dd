// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model and rendering summary text.

use std::fmt::Write;
use std::time::Duration;

use crate::model::TinModel;

/// Statistics of a finished wireframe render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireframeStats {
    pub vertex_count: usize,
    pub reduction: f64,
    pub elapsed: Duration,
}

/// Statistics of a finished grid build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterStats {
    pub reduction: f64,
    pub elapsed: Duration,
}

/// `0` is not available, `1` is full resolution, `n` reads "n to 1".
pub fn format_reduction(reduction: f64) -> String {
    if reduction == 0.0 || !reduction.is_finite() {
        "N/A".to_string()
    } else if reduction == 1.0 {
        "Full Resolution".to_string()
    } else {
        format!("{} to 1", reduction.round() as i64)
    }
}

/// Build the report for `model` and whatever rendering has finished.
pub fn build_report(
    model: &dyn TinModel,
    wireframe: Option<&WireframeStats>,
    raster: Option<&RasterStats>,
    visible_range: Option<(f64, f64)>,
) -> String {
    let bounds = model.bounds();
    let mut s = String::with_capacity(2048);

    // Writing to a String cannot fail
    let _ = writeln!(s, "Model");
    let _ = writeln!(s, "  Name: {}", model.name());
    let _ = writeln!(s, "  Type: {}", model.description());
    let _ = writeln!(s, "  Vertices:         {:8}", model.vertex_count());
    if let Some(load_time) = model.load_time() {
        let _ = writeln!(s, "  Load time(ms):    {:8}", load_time.as_millis());
    }
    let _ = writeln!(s, "  Bounds");
    let _ = writeln!(s, "    Min X:          {}", model.format_x(bounds.min_x));
    let _ = writeln!(s, "    Max X:          {}", model.format_x(bounds.max_x));
    let _ = writeln!(s, "    Min Y:          {}", model.format_y(bounds.min_y));
    let _ = writeln!(s, "    Max Y:          {}", model.format_y(bounds.max_y));
    let _ = writeln!(s, "    Min Z:          {:11.2}", bounds.min_z);
    let _ = writeln!(s, "    Max Z:          {:11.2}", bounds.max_z);
    let _ = writeln!(s, "  Area:             {:11.2}", bounds.area());
    let _ = writeln!(s, "  Est. Avg. Spacing:{:11.2}", model.nominal_point_spacing());

    let _ = writeln!(s, "Rendering");
    let _ = writeln!(s, "  Wireframe");
    match wireframe {
        Some(stats) => {
            let _ = writeln!(s, "    Vertices:      {:8}", stats.vertex_count);
            let _ = writeln!(s, "    Reduction:     {}", format_reduction(stats.reduction));
            let _ = writeln!(s, "    Time(ms):      {:8}", stats.elapsed.as_millis());
        }
        None => {
            let _ = writeln!(s, "    Not Available");
        }
    }
    let _ = writeln!(s, "  Raster");
    match raster {
        Some(stats) => {
            let _ = writeln!(s, "    Reduction:     {}", format_reduction(stats.reduction));
            let _ = writeln!(s, "    Time(ms):      {:8}", stats.elapsed.as_millis());
        }
        None => {
            let _ = writeln!(s, "    Not Available");
        }
    }

    if let Some((min, max)) = visible_range {
        let _ = writeln!(s);
        let _ = writeln!(s, "Range of visible samples");
        let _ = writeln!(s, "    Min:      {:11.3}", min);
        let _ = writeln!(s, "    Max:      {:11.3}", max);
    }
    s
}
