// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for compositing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up a composite.
///
/// Missing data, exterior queries and cancelled builds are not errors; they
/// surface as NaN cells, "not available" report text or a
/// [`BuildOutcome`](crate::grid::BuildOutcome).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Composite requires a model")]
    MissingModel,

    #[error("Composite requires rendering options")]
    MissingOptions,

    #[error("Invalid viewport size: {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("Transform is not invertible")]
    SingularTransform,

    #[error("Transform rotates or shears the model (m01={m01}, m10={m10}); only axis-aligned transforms are supported")]
    RotatedTransform { m01: f64, m10: f64 },

    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("Invalid rendering option: {0}")]
    InvalidOption(String),

    #[error("Options parse error: {0}")]
    OptionsParse(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
