// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface interpolators that evaluate a TIN at arbitrary points.

pub mod gwr;
pub mod natural_neighbor;
pub mod stats;

pub use gwr::{BandwidthMethod, Estimate, GwrInterpolator, RegressionSurface, SurfaceForm};
pub use natural_neighbor::NaturalNeighborInterpolator;
