// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-pixel surface sampling.
//!
//! A [`ValueGrid`] holds three channels per viewport pixel: the value and
//! its two first partial derivatives. Cells start as NaN and stay NaN when
//! they fall outside the model bounds, outside the TIN, or were never
//! reached because the build was cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tinview_tin::{BandwidthMethod, Bounds, GwrInterpolator, NaturalNeighborInterpolator, SurfaceForm, Tin};

use crate::transform::ViewTransform;

/// Channels per cell: value, dz/dx, dz/dy.
pub const CHANNELS: usize = 3;

/// Bandwidth proportion for the derivative-mode regression.
pub const GRID_BANDWIDTH: f64 = 1.0;

/// Cooperative cancellation, polled at row boundaries.
pub trait Cancellation: Sync {
    fn is_cancelled(&self) -> bool;
}

impl Cancellation for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl Cancellation for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// How a grid build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every row was visited and the grid is marked complete.
    Complete,
    /// Stopped early; unreached rows remain NaN.
    Cancelled,
    /// No TIN was available to sample.
    Unavailable,
}

/// Row-major grid of `[value, dz/dx, dz/dy]` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGrid {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

impl ValueGrid {
    /// A grid with every channel of every cell set to NaN.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![f32::NAN; width * height * CHANNELS],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of floats in one row.
    pub fn row_stride(&self) -> usize {
        self.width * CHANNELS
    }

    pub fn cell(&self, col: usize, row: usize) -> [f32; CHANNELS] {
        let i = row * self.row_stride() + col * CHANNELS;
        [self.cells[i], self.cells[i + 1], self.cells[i + 2]]
    }

    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.cells[row * self.row_stride() + col * CHANNELS]
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = [f32; CHANNELS]> + '_ {
        self.cells.chunks_exact(CHANNELS).map(|c| [c[0], c[1], c[2]])
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// Min and max of the finite values, or `None` when there are none.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .step_by(CHANNELS)
            .filter(|v| v.is_finite())
            .fold(None, |range, &v| {
                let v = v as f64;
                Some(match range {
                    Some((lo, hi)) => (f64::min(lo, v), f64::max(hi, v)),
                    None => (v, v),
                })
            })
    }
}

/// One sample from a [`SurfaceSampler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub value: f64,
    /// `(dz/dx, dz/dy)` when the backend computes derivatives
    pub gradient: Option<(f64, f64)>,
}

/// The interpolation backend used to fill a grid.
#[derive(Debug, Clone)]
pub enum SurfaceSampler {
    /// Quadratic local regression; provides derivatives for hillshade.
    Regression(GwrInterpolator),
    /// Natural-neighbor interpolation; values only.
    NaturalNeighbor(NaturalNeighborInterpolator),
}

impl SurfaceSampler {
    pub fn for_mode(tin: Arc<Tin>, derivatives: bool) -> Self {
        if derivatives {
            Self::Regression(GwrInterpolator::new(tin))
        } else {
            Self::NaturalNeighbor(NaturalNeighborInterpolator::new(tin))
        }
    }

    pub fn computes_derivatives(&self) -> bool {
        matches!(self, Self::Regression(_))
    }

    /// Sample at a model point. `None` means no data.
    pub fn sample(&self, x: f64, y: f64) -> Option<SurfaceSample> {
        match self {
            Self::Regression(gwr) => {
                let estimate = gwr.interpolate(
                    SurfaceForm::QuadraticWithCrossTerms,
                    BandwidthMethod::FixedProportional,
                    GRID_BANDWIDTH,
                    x,
                    y,
                );
                if estimate.was_exterior() || !estimate.value().is_finite() {
                    return None;
                }
                let surface = estimate.surface()?;
                let beta = surface.coefficients();
                Some(SurfaceSample {
                    value: estimate.value(),
                    gradient: Some((beta[1], beta[2])),
                })
            }
            Self::NaturalNeighbor(nni) => {
                let value = nni.interpolate(x, y);
                value.is_finite().then_some(SurfaceSample { value, gradient: None })
            }
        }
    }
}

/// Fills grid rows by mapping pixel centers into the model.
#[derive(Debug, Clone)]
pub struct RowSampler<'a> {
    transform: &'a ViewTransform,
    bounds: Bounds,
    width: usize,
    sampler: &'a SurfaceSampler,
}

impl<'a> RowSampler<'a> {
    pub fn new(transform: &'a ViewTransform, bounds: Bounds, width: usize, sampler: &'a SurfaceSampler) -> Self {
        Self {
            transform,
            bounds,
            width,
            sampler,
        }
    }

    /// Sample the rows held in `rows`, the first of which is grid row `row0`.
    ///
    /// Returns `false` when cancellation was observed before all rows were
    /// visited.
    pub fn sample_rows(&self, row0: usize, rows: &mut [f32], cancel: &dyn Cancellation) -> bool {
        let stride = self.width * CHANNELS;
        if stride == 0 {
            return true;
        }
        let width = self.width as f64;

        for (offset, row) in rows.chunks_mut(stride).enumerate() {
            if cancel.is_cancelled() {
                return false;
            }

            let center = (row0 + offset) as f64 + 0.5;
            let (x0, y0) = self.transform.viewport_to_model(0.0, center);
            let (x1, y1) = self.transform.viewport_to_model(width, center);
            // y0 == y1, transforms are axis-aligned
            let y = (y0 + y1) / 2.0;
            if !self.bounds.contains_y(y) {
                continue;
            }

            let dx = (x1 - x0) / width;
            for (col, cell) in row.chunks_exact_mut(CHANNELS).enumerate() {
                let x = (col as f64 + 0.5) * dx + x0;
                if !self.bounds.contains_x(x) {
                    continue;
                }
                match self.sampler.sample(x, y) {
                    Some(sample) => {
                        cell[0] = sample.value as f32;
                        if let Some((zx, zy)) = sample.gradient {
                            cell[1] = zx as f32;
                            cell[2] = zy as f32;
                        }
                    }
                    None => cell[0] = f32::NAN,
                }
            }
        }
        true
    }

    /// Sample the whole grid in tasks of `rows_per_task` rows on the current
    /// rayon pool. Returns `false` when any task was cancelled.
    pub fn sample_grid(&self, grid: &mut ValueGrid, rows_per_task: usize, cancel: &dyn Cancellation) -> bool {
        let rows_per_task = rows_per_task.max(1);
        let chunk = grid.row_stride() * rows_per_task;
        if chunk == 0 {
            return true;
        }
        grid.raw_mut()
            .par_chunks_mut(chunk)
            .enumerate()
            .map(|(task, rows)| self.sample_rows(task * rows_per_task, rows, cancel))
            .reduce(|| true, |a, b| a && b)
    }
}
