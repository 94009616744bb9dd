// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Natural neighbor (Sibson) interpolation over a TIN.

use std::sync::Arc;

use spade::Point2;

use crate::tin::Tin;

/// Area-weighted interpolation using the natural neighbors of the query.
///
/// Exact at the sample points and C1 away from them. Produces no
/// derivative information.
#[derive(Debug, Clone)]
pub struct NaturalNeighborInterpolator {
    tin: Arc<Tin>,
}

impl NaturalNeighborInterpolator {
    pub fn new(tin: Arc<Tin>) -> Self {
        Self { tin }
    }

    pub fn tin(&self) -> &Arc<Tin> {
        &self.tin
    }

    /// Interpolated value at `(x, y)`, or NaN outside the convex hull.
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        self.tin
            .triangulation()
            .natural_neighbor()
            .interpolate(|v| v.data().z, Point2::new(x, y))
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::Vertex;
    use approx::assert_relative_eq;

    fn grid(f: impl Fn(f64, f64) -> f64) -> Arc<Tin> {
        let mut vs = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let (x, y) = (i as f64 * 2.0, j as f64 * 2.0);
                vs.push(Vertex::new(x, y, f(x, y), (i * 6 + j) as i32));
            }
        }
        Arc::new(Tin::from_vertices(vs).unwrap())
    }

    #[test]
    fn flat_surface_reproduces_constant() {
        let nni = NaturalNeighborInterpolator::new(grid(|_, _| 10.0));
        assert_relative_eq!(nni.interpolate(3.3, 7.1), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_surface_is_reproduced() {
        let nni = NaturalNeighborInterpolator::new(grid(|x, y| 2.0 * x - y + 1.0));
        assert_relative_eq!(nni.interpolate(4.5, 5.5), 2.0 * 4.5 - 5.5 + 1.0, epsilon = 1e-9);
    }

    #[test]
    fn outside_hull_is_nan() {
        let nni = NaturalNeighborInterpolator::new(grid(|_, _| 1.0));
        assert!(nni.interpolate(-1.0, 5.0).is_nan());
    }
}
