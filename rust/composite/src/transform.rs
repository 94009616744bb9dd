// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping between model coordinates and viewport pixels.
//!
//! Row sampling evaluates one model-space y per pixel row, and the visible
//! window is an axis-aligned box in model space. Both hold only when the
//! transform has no rotation or shear, so such transforms are rejected at
//! construction.

use nalgebra::{Matrix3, Point2};
use tinview_tin::{Bounds, Vertex};

use crate::error::{Error, Result};

/// An affine model-to-viewport transform and its inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    model_to_view: Matrix3<f64>,
    view_to_model: Matrix3<f64>,
}

impl ViewTransform {
    /// Build from a homogeneous model-to-viewport matrix.
    pub fn new(model_to_view: Matrix3<f64>) -> Result<Self> {
        let m01 = model_to_view[(0, 1)];
        let m10 = model_to_view[(1, 0)];
        if m01 != 0.0 || m10 != 0.0 {
            return Err(Error::RotatedTransform { m01, m10 });
        }
        let view_to_model = model_to_view
            .try_inverse()
            .filter(|m| m.iter().all(|v| v.is_finite()))
            .ok_or(Error::SingularTransform)?;
        Ok(Self {
            model_to_view,
            view_to_model,
        })
    }

    /// `view = (sx·x + tx, sy·y + ty)`
    pub fn from_scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Result<Self> {
        Self::new(Matrix3::new(sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0))
    }

    /// Fit `bounds` into a `width` x `height` viewport with a uniform scale,
    /// centered, y axis pointing up, leaving `margin` pixels on each side.
    pub fn fit(bounds: &Bounds, width: u32, height: u32, margin: f64) -> Result<Self> {
        if bounds.is_empty() {
            return Err(Error::SingularTransform);
        }
        let usable_w = width as f64 - 2.0 * margin;
        let usable_h = height as f64 - 2.0 * margin;
        let sx = if bounds.width() > 0.0 { usable_w / bounds.width() } else { f64::INFINITY };
        let sy = if bounds.height() > 0.0 { usable_h / bounds.height() } else { f64::INFINITY };
        let scale = sx.min(sy);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::SingularTransform);
        }
        let cx = (bounds.min_x + bounds.max_x) / 2.0;
        let cy = (bounds.min_y + bounds.max_y) / 2.0;
        Self::from_scale_translate(
            scale,
            -scale,
            width as f64 / 2.0 - scale * cx,
            height as f64 / 2.0 + scale * cy,
        )
    }

    pub fn model_to_view_matrix(&self) -> &Matrix3<f64> {
        &self.model_to_view
    }

    pub fn view_to_model_matrix(&self) -> &Matrix3<f64> {
        &self.view_to_model
    }

    #[inline]
    pub fn model_to_viewport(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.model_to_view.transform_point(&Point2::new(x, y));
        (p.x, p.y)
    }

    #[inline]
    pub fn viewport_to_model(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.view_to_model.transform_point(&Point2::new(x, y));
        (p.x, p.y)
    }

    /// Map a batch of model points to the viewport.
    pub fn map_model_to_viewport(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|p| self.model_to_view.transform_point(p))
            .collect()
    }

    /// Map a batch of viewport points to the model.
    pub fn map_viewport_to_model(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|p| self.view_to_model.transform_point(p))
            .collect()
    }
}

/// The model-space rectangle covered by the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

//       1010     1000    1001
//       0010     0000    0001
//       0110     0100    0101
impl VisibleWindow {
    pub const LEFT: u8 = 0b0010;
    pub const RIGHT: u8 = 0b0001;
    pub const BOTTOM: u8 = 0b0100;
    pub const TOP: u8 = 0b1000;

    /// Map the lower-left `(0, height)` and upper-right `(width, 0)`
    /// viewport corners into the model.
    pub fn from_viewport(transform: &ViewTransform, width: u32, height: u32) -> Self {
        let (ax, ay) = transform.viewport_to_model(0.0, height as f64);
        let (bx, by) = transform.viewport_to_model(width as f64, 0.0);
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    /// Cohen-Sutherland code of a point. Points on the window boundary
    /// are inside.
    #[inline]
    pub fn outcode(&self, x: f64, y: f64) -> u8 {
        let mut code = 0;
        if x < self.x0 {
            code |= Self::LEFT;
        } else if x > self.x1 {
            code |= Self::RIGHT;
        }
        if y < self.y0 {
            code |= Self::BOTTOM;
        } else if y > self.y1 {
            code |= Self::TOP;
        }
        code
    }

    #[inline]
    pub fn outcode_of(&self, v: &Vertex) -> u8 {
        self.outcode(v.x, v.y)
    }

    /// Inclusive containment.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }

    /// A segment is trivially off-window when both ends lie beyond the
    /// same window side.
    #[inline]
    pub fn trivially_rejects(code_a: u8, code_b: u8) -> bool {
        code_a & code_b != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transform() -> ViewTransform {
        // 2 px per unit, y flipped, origin at (10, 210)
        ViewTransform::from_scale_translate(2.0, -2.0, 10.0, 210.0).unwrap()
    }

    #[test]
    fn round_trip_recovers_model_points() {
        let t = transform();
        let points = vec![Point2::new(0.0, 0.0), Point2::new(-3.25, 17.5), Point2::new(1e5, -2e4)];
        let back = t.map_viewport_to_model(&t.map_model_to_viewport(&points));
        for (p, q) in points.iter().zip(&back) {
            assert_relative_eq!(p.x, q.x, epsilon = 1e-9);
            assert_relative_eq!(p.y, q.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn rotation_is_rejected() {
        let angle: f64 = 0.3;
        let m = Matrix3::new(angle.cos(), -angle.sin(), 0.0, angle.sin(), angle.cos(), 0.0, 0.0, 0.0, 1.0);
        assert!(matches!(ViewTransform::new(m), Err(Error::RotatedTransform { .. })));
    }

    #[test]
    fn singular_transform_is_rejected() {
        assert!(matches!(
            ViewTransform::from_scale_translate(0.0, 1.0, 0.0, 0.0),
            Err(Error::SingularTransform)
        ));
    }

    #[test]
    fn visible_window_from_corners() {
        let w = VisibleWindow::from_viewport(&transform(), 200, 100);
        assert_relative_eq!(w.x0, -5.0);
        assert_relative_eq!(w.x1, 95.0);
        assert_relative_eq!(w.y0, 55.0);
        assert_relative_eq!(w.y1, 105.0);
    }

    #[test]
    fn boundary_points_have_zero_outcode() {
        let w = VisibleWindow { x0: 0.0, y0: 0.0, x1: 10.0, y1: 5.0 };
        assert_eq!(w.outcode(0.0, 0.0), 0);
        assert_eq!(w.outcode(10.0, 5.0), 0);
        assert_eq!(w.outcode(10.0, 2.0), 0);
        assert_eq!(w.outcode(-0.1, 2.0), VisibleWindow::LEFT);
        assert_eq!(w.outcode(10.1, 5.1), VisibleWindow::RIGHT | VisibleWindow::TOP);
        assert_eq!(w.outcode(5.0, -1.0), VisibleWindow::BOTTOM);
    }

    #[test]
    fn trivial_rejection_needs_a_shared_side() {
        let w = VisibleWindow { x0: 0.0, y0: 0.0, x1: 10.0, y1: 10.0 };
        let left_low = w.outcode(-1.0, 2.0);
        let left_high = w.outcode(-1.0, 8.0);
        let right = w.outcode(11.0, 5.0);
        assert!(VisibleWindow::trivially_rejects(left_low, left_high));
        assert!(!VisibleWindow::trivially_rejects(left_low, right));
    }

    #[test]
    fn fit_centers_bounds() {
        let bounds = Bounds::from_vertices(&[Vertex::new(0.0, 0.0, 0.0, 0), Vertex::new(100.0, 50.0, 0.0, 1)]);
        let t = ViewTransform::fit(&bounds, 220, 120, 10.0).unwrap();
        let (x, y) = t.model_to_viewport(50.0, 25.0);
        assert_relative_eq!(x, 110.0, epsilon = 1e-9);
        assert_relative_eq!(y, 60.0, epsilon = 1e-9);
        let (x, y) = t.model_to_viewport(0.0, 50.0);
        assert_relative_eq!(x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(y, 10.0, epsilon = 1e-9);
    }
}
