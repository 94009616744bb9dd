// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progressive selection of the TIN used for interpolation.
//!
//! Refined TINs arrive while a composite is live. A candidate replaces the
//! active source only when its reduction factor is strictly lower, so the
//! selection only ever moves toward full resolution.

use std::sync::{Arc, PoisonError, RwLock};

use tinview_tin::{GwrInterpolator, NeighborEdgeVertex, Tin};

/// A TIN together with the interpolator and point locator bound to it.
///
/// Sources are immutable and shared by `Arc`, so a reader always sees a
/// TIN and interpolator that belong together.
#[derive(Debug)]
pub struct InterpolationSource {
    tin: Arc<Tin>,
    reduction_factor: f64,
    interpolator: GwrInterpolator,
}

impl InterpolationSource {
    pub fn new(tin: Arc<Tin>, reduction_factor: f64) -> Self {
        let interpolator = GwrInterpolator::new(Arc::clone(&tin));
        Self {
            tin,
            reduction_factor,
            interpolator,
        }
    }

    pub fn tin(&self) -> &Arc<Tin> {
        &self.tin
    }

    /// 1.0 for full resolution, larger for decimated TINs.
    pub fn reduction_factor(&self) -> f64 {
        self.reduction_factor
    }

    pub fn interpolator(&self) -> &GwrInterpolator {
        &self.interpolator
    }

    /// Nearest vertex, closest edge and interior flag for `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Option<NeighborEdgeVertex> {
        self.tin.locate(x, y)
    }
}

/// Holds the current best interpolation source.
#[derive(Debug, Default)]
pub struct SourceSelector {
    current: RwLock<Option<Arc<InterpolationSource>>>,
}

impl SourceSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A selector that starts from an existing source.
    pub fn with_source(source: Option<Arc<InterpolationSource>>) -> Self {
        Self {
            current: RwLock::new(source),
        }
    }

    /// Offer a TIN for interpolation. Returns whether it was selected.
    ///
    /// Ties and coarser candidates are ignored.
    pub fn submit_candidate(&self, tin: Arc<Tin>, reduction_factor: f64) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let active = current
            .as_ref()
            .map_or(f64::INFINITY, |s| s.reduction_factor);

        if reduction_factor < active {
            *current = Some(Arc::new(InterpolationSource::new(tin, reduction_factor)));
            tracing::debug!(
                reduction_factor,
                previous = active,
                "Selected interpolation TIN"
            );
            true
        } else {
            tracing::debug!(
                reduction_factor,
                active,
                "Rejected interpolation TIN candidate"
            );
            false
        }
    }

    /// The active source, or `None` before the first candidate.
    pub fn current(&self) -> Option<Arc<InterpolationSource>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reduction factor of the active source; infinity when none.
    pub fn reduction_factor(&self) -> f64 {
        self.current().map_or(f64::INFINITY, |s| s.reduction_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinview_tin::Vertex;

    fn tin(z: f64) -> Arc<Tin> {
        Arc::new(
            Tin::from_vertices([
                Vertex::new(0.0, 0.0, z, 0),
                Vertex::new(1.0, 0.0, z, 1),
                Vertex::new(0.0, 1.0, z, 2),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn starts_empty() {
        let selector = SourceSelector::new();
        assert!(selector.current().is_none());
        assert_eq!(selector.reduction_factor(), f64::INFINITY);
    }

    #[test]
    fn refinement_is_monotonic() {
        let selector = SourceSelector::new();
        assert!(selector.submit_candidate(tin(2.0), 2.0));
        assert!(!selector.submit_candidate(tin(4.0), 4.0));
        assert_eq!(selector.reduction_factor(), 2.0);
        assert_eq!(selector.current().unwrap().tin().bounds().max_z, 2.0);

        assert!(!selector.submit_candidate(tin(2.5), 2.0), "ties are rejected");
        assert_eq!(selector.current().unwrap().tin().bounds().max_z, 2.0);

        assert!(selector.submit_candidate(tin(1.0), 1.0));
        assert_eq!(selector.reduction_factor(), 1.0);
        assert_eq!(selector.current().unwrap().tin().bounds().max_z, 1.0);
    }

    #[test]
    fn nan_reduction_is_rejected() {
        let selector = SourceSelector::new();
        assert!(!selector.submit_candidate(tin(1.0), f64::NAN));
        assert!(selector.current().is_none());
    }

    #[test]
    fn interpolator_matches_tin() {
        let selector = SourceSelector::new();
        selector.submit_candidate(tin(3.0), 8.0);
        let source = selector.current().unwrap();
        assert!(Arc::ptr_eq(source.tin(), source.interpolator().tin()));
    }

    #[test]
    fn concurrent_submissions_keep_the_finest() {
        let selector = SourceSelector::new();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let selector = &selector;
                scope.spawn(move || {
                    for step in 0..20 {
                        let factor = 1.0 + ((worker * 20 + step) * 37 % 160) as f64;
                        selector.submit_candidate(tin(factor), factor);
                        let source = selector.current().unwrap();
                        // TIN z encodes its own reduction factor
                        assert_eq!(source.tin().bounds().max_z, source.reduction_factor());
                    }
                });
            }
        });
        assert_eq!(selector.reduction_factor(), 1.0);
    }
}
