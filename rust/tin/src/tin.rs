// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangulated irregular network backed by a Delaunay triangulation.
//!
//! The TIN is immutable once built. All queries take `&self`, so a single
//! instance can be shared across render workers behind an `Arc`.

use rustc_hash::FxHashSet;
use spade::handles::{DirectedEdgeHandle, VertexHandle};
use spade::{DelaunayTriangulation, Point2, PositionInTriangulation, Triangulation};

use crate::bounds::Bounds;
use crate::error::{Error, Result};
use crate::vertex::{Edge, Vertex};

/// Result of a nearest-vertex point location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborEdgeVertex {
    /// The vertex closest to the query point.
    pub nearest: Vertex,
    /// Planar distance from the query point to `nearest`.
    pub distance: f64,
    /// The edge of the enclosing triangle closest to the query point, or the
    /// nearest hull edge when the query lies outside the triangulation.
    pub edge: Option<Edge>,
    /// Whether the query point lies inside (or on the boundary of) the hull.
    pub interior: bool,
}

/// A triangulated irregular network.
pub struct Tin {
    triangulation: DelaunayTriangulation<Vertex>,
    bounds: Bounds,
}

impl Tin {
    /// Triangulate a set of vertices.
    ///
    /// Vertices sharing a planar position collapse to a single vertex.
    pub fn from_vertices(vertices: impl IntoIterator<Item = Vertex>) -> Result<Self> {
        let mut triangulation = DelaunayTriangulation::<Vertex>::new();
        for v in vertices {
            if !v.is_finite() {
                return Err(Error::NonFiniteVertex {
                    index: v.index,
                    x: v.x,
                    y: v.y,
                    z: v.z,
                });
            }
            triangulation
                .insert(v)
                .map_err(|e| Error::Insertion(format!("{:?}", e)))?;
        }

        if triangulation.num_inner_faces() == 0 {
            return Err(Error::Degenerate(triangulation.num_vertices()));
        }

        let inserted: Vec<Vertex> = triangulation.vertices().map(|v| *v.data()).collect();
        let bounds = Bounds::from_vertices(&inserted);

        tracing::debug!(
            vertices = triangulation.num_vertices(),
            triangles = triangulation.num_inner_faces(),
            "Built TIN"
        );

        Ok(Self {
            triangulation,
            bounds,
        })
    }

    pub(crate) fn triangulation(&self) -> &DelaunayTriangulation<Vertex> {
        &self.triangulation
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.triangulation.num_vertices()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangulation.num_inner_faces()
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        self.triangulation.vertices().map(|v| *v.data()).collect()
    }

    /// Every edge of the triangulation, once each.
    pub fn edges(&self) -> Vec<Edge> {
        self.triangulation
            .undirected_edges()
            .map(|edge| {
                let [a, b] = edge.vertices();
                Edge::new(*a.data(), *b.data())
            })
            .collect()
    }

    /// Mean edge length, a rough measure of sample density.
    pub fn nominal_spacing(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for edge in self.triangulation.undirected_edges() {
            let [a, b] = edge.vertices();
            sum += a.data().distance_xy(b.data().x, b.data().y);
            count += 1;
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Whether `(x, y)` is inside the triangulated area. Points on the hull
    /// boundary count as inside.
    pub fn is_interior(&self, x: f64, y: f64) -> bool {
        matches!(
            self.triangulation.locate(Point2::new(x, y)),
            PositionInTriangulation::OnFace(_)
                | PositionInTriangulation::OnEdge(_)
                | PositionInTriangulation::OnVertex(_)
        )
    }

    /// Find the vertex nearest to `(x, y)` together with the closest edge of
    /// the enclosing triangle.
    pub fn locate(&self, x: f64, y: f64) -> Option<NeighborEdgeVertex> {
        let nearest = *self.triangulation.nearest_neighbor(Point2::new(x, y))?.data();

        let (edge, interior) = match self.triangulation.locate(Point2::new(x, y)) {
            PositionInTriangulation::OnFace(face) => {
                let edges = self.triangulation.face(face).adjacent_edges();
                let closest = edges.iter().min_by(|p, q| {
                    edge_distance(p, x, y).total_cmp(&edge_distance(q, x, y))
                });
                (closest.map(to_edge), true)
            }
            PositionInTriangulation::OnEdge(edge) => {
                (Some(to_edge(&self.triangulation.directed_edge(edge))), true)
            }
            PositionInTriangulation::OnVertex(vertex) => {
                let edge = self.triangulation.vertex(vertex).out_edge();
                (edge.as_ref().map(to_edge), true)
            }
            PositionInTriangulation::OutsideOfConvexHull(edge) => {
                (Some(to_edge(&self.triangulation.directed_edge(edge))), false)
            }
            PositionInTriangulation::NoTriangulation => (None, false),
        };

        Some(NeighborEdgeVertex {
            nearest,
            distance: nearest.distance_xy(x, y),
            edge,
            interior,
        })
    }

    /// Collect samples around `(x, y)` by walking vertex adjacency outward
    /// from the nearest vertex.
    ///
    /// At least two rings are always visited. Further rings are added until
    /// `min_samples` vertices are collected or `max_rings` is reached.
    pub fn neighborhood(&self, x: f64, y: f64, min_samples: usize, max_rings: usize) -> Vec<Vertex> {
        let Some(start) = self.triangulation.nearest_neighbor(Point2::new(x, y)) else {
            return Vec::new();
        };

        let mut visited = FxHashSet::default();
        visited.insert(start.fix());
        let mut samples = vec![*start.data()];
        let mut ring: Vec<VertexHandle<'_, Vertex>> = vec![start];

        for depth in 0..max_rings {
            if depth >= 2 && samples.len() >= min_samples {
                break;
            }
            let mut next = Vec::new();
            for v in &ring {
                for out in v.out_edges() {
                    let to = out.to();
                    if visited.insert(to.fix()) {
                        samples.push(*to.data());
                        next.push(to);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            ring = next;
        }

        samples
    }
}

impl std::fmt::Debug for Tin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tin")
            .field("vertices", &self.vertex_count())
            .field("triangles", &self.triangle_count())
            .field("bounds", &self.bounds)
            .finish()
    }
}

fn to_edge(edge: &DirectedEdgeHandle<'_, Vertex, (), (), ()>) -> Edge {
    Edge::new(*edge.from().data(), *edge.to().data())
}

/// Distance from `(x, y)` to the segment spanned by a directed edge.
fn edge_distance(edge: &DirectedEdgeHandle<'_, Vertex, (), (), ()>, x: f64, y: f64) -> f64 {
    let a = *edge.from().data();
    let b = *edge.to().data();
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a.distance_xy(x, y);
    }
    let t = (((x - a.x) * dx + (y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let px = a.x + t * dx - x;
    let py = a.y + t * dy - y;
    (px * px + py * py).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Tin {
        Tin::from_vertices([
            Vertex::new(0.0, 0.0, 1.0, 0),
            Vertex::new(10.0, 0.0, 2.0, 1),
            Vertex::new(10.0, 10.0, 3.0, 2),
            Vertex::new(0.0, 10.0, 4.0, 3),
        ])
        .unwrap()
    }

    #[test]
    fn square_has_five_edges_and_two_triangles() {
        let tin = square();
        assert_eq!(tin.vertex_count(), 4);
        assert_eq!(tin.triangle_count(), 2);
        let edges = tin.edges();
        assert_eq!(edges.len(), 5);
        assert!(edges.iter().all(|e| !e.is_ghost()));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let result = Tin::from_vertices([
            Vertex::new(0.0, 0.0, 0.0, 0),
            Vertex::new(1.0, 1.0, 0.0, 1),
            Vertex::new(2.0, 2.0, 0.0, 2),
        ]);
        assert!(matches!(result, Err(Error::Degenerate(3))));
    }

    #[test]
    fn non_finite_vertices_are_rejected() {
        let result = Tin::from_vertices([
            Vertex::new(0.0, 0.0, 0.0, 0),
            Vertex::new(f64::NAN, 1.0, 0.0, 1),
        ]);
        assert!(matches!(result, Err(Error::NonFiniteVertex { index: 1, .. })));
    }

    #[test]
    fn locate_reports_nearest_vertex_and_interior() {
        let tin = square();
        let hit = tin.locate(9.0, 8.0).unwrap();
        assert_eq!(hit.nearest.index, 2);
        assert!(hit.interior);
        assert!((hit.distance - (1.0f64 + 4.0).sqrt()).abs() < 1e-12);
        assert!(hit.edge.is_some());

        let outside = tin.locate(15.0, 5.0).unwrap();
        assert!(!outside.interior);
        assert!(outside.edge.is_some());
    }

    #[test]
    fn locate_picks_closest_triangle_edge() {
        let tin = square();
        let hit = tin.locate(5.0, 0.5).unwrap();
        let (a, b) = hit.edge.and_then(|e| e.endpoints()).unwrap();
        let mut ends = [a.index, b.index];
        ends.sort();
        assert_eq!(ends, [0, 1]);
        assert_eq!(tin.bounds().min_x, 0.0);
        assert_eq!(tin.bounds().max_z, 4.0);
    }

    #[test]
    fn hull_boundary_is_interior() {
        let tin = square();
        assert!(tin.is_interior(5.0, 0.0));
        assert!(tin.is_interior(0.0, 0.0));
        assert!(!tin.is_interior(-0.5, 5.0));
    }

    #[test]
    fn neighborhood_collects_adjacent_vertices() {
        let tin = square();
        let samples = tin.neighborhood(1.0, 1.0, 3, 4);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].index, 0);
    }

    #[test]
    fn bounds_follow_vertices() {
        let tin = square();
        assert_eq!(tin.bounds().max_x, 10.0);
        assert_eq!(tin.bounds().min_z, 1.0);
        assert!((tin.nominal_spacing() - (40.0 + 200f64.sqrt()) / 5.0).abs() < 1e-9);
    }
}
