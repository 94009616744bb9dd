// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample points and edges of a TIN.

use spade::{HasPosition, Point2};

/// A sample point of the surface.
///
/// Vertices with a negative index are auxiliary (perimeter or synthetic)
/// points. They take part in the triangulation but are never tracked by
/// index-keyed bookkeeping such as the wireframe deduplication bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub index: i32,
}

impl Vertex {
    /// Index carried by auxiliary vertices.
    pub const UNINDEXED: i32 = -1;

    #[inline]
    pub fn new(x: f64, y: f64, z: f64, index: i32) -> Self {
        Self { x, y, z, index }
    }

    /// Create an auxiliary vertex that carries no index.
    #[inline]
    pub fn unindexed(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z, Self::UNINDEXED)
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index >= 0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Planar distance to `(x, y)`.
    #[inline]
    pub fn distance_xy(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl HasPosition for Vertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// An edge between two vertices.
///
/// Either endpoint may be absent. Such "ghost" edges describe constructs on
/// the boundary of the triangulation and carry no drawable geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: Option<Vertex>,
    pub b: Option<Vertex>,
}

impl Edge {
    #[inline]
    pub fn new(a: Vertex, b: Vertex) -> Self {
        Self {
            a: Some(a),
            b: Some(b),
        }
    }

    /// An edge with only one real endpoint.
    #[inline]
    pub fn ghost(a: Vertex) -> Self {
        Self { a: Some(a), b: None }
    }

    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.a.is_none() || self.b.is_none()
    }

    /// Both endpoints, or `None` for a ghost edge.
    #[inline]
    pub fn endpoints(&self) -> Option<(Vertex, Vertex)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}
