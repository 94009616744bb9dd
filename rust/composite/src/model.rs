// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The data source rendered by a composite.

use std::sync::Arc;
use std::time::Duration;

use tinview_tin::{Bounds, Tin};

/// A surface model: sample data, its extent, and the TIN built from it.
///
/// Loading is the caller's concern. A composite only reads from the model.
pub trait TinModel: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        "TIN"
    }

    /// Whether loading has finished and the reference TIN is available.
    fn is_loaded(&self) -> bool;

    fn bounds(&self) -> Bounds;

    fn vertex_count(&self) -> usize;

    /// The TIN to interpolate against before any refinement arrives, with
    /// its reduction factor.
    fn reference_tin(&self) -> Option<(Arc<Tin>, f64)>;

    fn nominal_point_spacing(&self) -> f64 {
        match self.reference_tin() {
            Some((tin, _)) => tin.nominal_spacing(),
            None => f64::NAN,
        }
    }

    fn load_time(&self) -> Option<Duration> {
        None
    }

    fn format_x(&self, x: f64) -> String {
        format!("{:.2}", x)
    }

    fn format_y(&self, y: f64) -> String {
        format!("{:.2}", y)
    }

    fn format_coordinates(&self, x: f64, y: f64) -> String {
        format!("{}, {}", self.format_x(x), self.format_y(y))
    }
}

/// A model backed by an already-built full-resolution TIN.
#[derive(Debug, Clone)]
pub struct TinSurfaceModel {
    name: String,
    description: String,
    tin: Arc<Tin>,
    load_time: Option<Duration>,
}

impl TinSurfaceModel {
    pub fn new(name: impl Into<String>, tin: Arc<Tin>) -> Self {
        Self {
            name: name.into(),
            description: "TIN".into(),
            tin,
            load_time: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_load_time(mut self, load_time: Duration) -> Self {
        self.load_time = Some(load_time);
        self
    }

    pub fn tin(&self) -> &Arc<Tin> {
        &self.tin
    }
}

impl TinModel for TinSurfaceModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn bounds(&self) -> Bounds {
        *self.tin.bounds()
    }

    fn vertex_count(&self) -> usize {
        self.tin.vertex_count()
    }

    fn reference_tin(&self) -> Option<(Arc<Tin>, f64)> {
        Some((Arc::clone(&self.tin), 1.0))
    }

    fn load_time(&self) -> Option<Duration> {
        self.load_time
    }
}
