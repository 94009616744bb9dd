// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned extent of a sample set.

use crate::vertex::Vertex;

/// Minimum and maximum of each coordinate over a set of vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Bounds {
    /// An empty extent; any vertex added widens it.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    pub fn from_vertices<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> Self {
        let mut bounds = Self::empty();
        for v in vertices {
            bounds.include(v);
        }
        bounds
    }

    pub fn include(&mut self, v: &Vertex) {
        self.min_x = self.min_x.min(v.x);
        self.max_x = self.max_x.max(v.x);
        self.min_y = self.min_y.min(v.y);
        self.max_y = self.max_y.max(v.y);
        self.min_z = self.min_z.min(v.z);
        self.max_z = self.max_z.max(v.z);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    /// Inclusive test on x alone.
    #[inline]
    pub fn contains_x(&self, x: f64) -> bool {
        self.min_x <= x && x <= self.max_x
    }

    /// Inclusive test on y alone.
    #[inline]
    pub fn contains_y(&self, y: f64) -> bool {
        self.min_y <= y && y <= self.max_y
    }

    #[inline]
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.contains_x(x) && self.contains_y(y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}
