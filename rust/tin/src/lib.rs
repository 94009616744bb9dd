// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # TinView TIN
//!
//! Triangulated irregular networks and the interpolators that evaluate
//! them. A [`Tin`] is built once from scattered samples and is then
//! read-only, so it can be shared between rendering workers.
//!
//! Two interpolators are provided:
//!
//! - [`NaturalNeighborInterpolator`]: Sibson interpolation, value only.
//! - [`GwrInterpolator`]: local weighted polynomial regression that also
//!   yields partial derivatives, curvature terms and prediction intervals.

pub mod bounds;
pub mod error;
pub mod interpolation;
pub mod tin;
pub mod vertex;

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use interpolation::{
    BandwidthMethod, Estimate, GwrInterpolator, NaturalNeighborInterpolator, RegressionSurface,
    SurfaceForm,
};
pub use tin::{NeighborEdgeVertex, Tin};
pub use vertex::{Edge, Vertex};
