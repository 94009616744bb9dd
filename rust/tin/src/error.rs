// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for TIN construction.

/// Result type alias for TIN operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a TIN.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A vertex carried a NaN or infinite coordinate.
    #[error("vertex {index} has a non-finite coordinate ({x}, {y}, {z})")]
    NonFiniteVertex { index: i32, x: f64, y: f64, z: f64 },

    /// The triangulation refused a vertex.
    #[error("vertex insertion failed: {0}")]
    Insertion(String),

    /// Fewer than three distinct, non-collinear vertices were supplied.
    #[error("TIN is degenerate: {0} distinct vertices and no triangles")]
    Degenerate(usize),
}
