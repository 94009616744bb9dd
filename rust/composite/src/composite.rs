// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-render-task aggregate.
//!
//! A [`Composite`] fixes a viewport and transform for its whole life and
//! collects everything produced for that view: the selected interpolation
//! TIN, the sampled grid, the raster and wireframe images, and timing. A
//! newer view is built with [`Composite::successor`], which carries the
//! reusable products forward.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use ab_glyph::FontArc;
use image::RgbaImage;
use nalgebra::Point2;
use tinview_tin::{Tin, Vertex};

use crate::canvas::ImageCanvas;
use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::grid::{BuildOutcome, Cancellation, RowSampler, SurfaceSampler, ValueGrid};
use crate::hillshade::RasterCompositor;
use crate::legend::{render_color_bar, ColorBarStyle};
use crate::model::TinModel;
use crate::options::RenderOptions;
use crate::query::{PointQuery, QueryResult};
use crate::report::{build_report, RasterStats, WireframeStats};
use crate::selector::SourceSelector;
use crate::transform::{ViewTransform, VisibleWindow};
use crate::wireframe::{WireframeRenderer, WireframeStyle};

/// Point size of vertex labels.
const LABEL_SIZE: f32 = 12.0;

/// A rendered wireframe.
#[derive(Debug, Clone)]
pub struct WireframeImage {
    pub image: RgbaImage,
    /// Edge endpoints inside the visible window, once per incident edge
    pub vertex_count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
struct TinSlots {
    wireframe: Option<(Arc<Tin>, f64)>,
    raster: Option<(Arc<Tin>, f64)>,
}

#[derive(Debug, Clone, Default)]
struct GridState {
    grid: Option<Arc<ValueGrid>>,
    complete: bool,
    includes_derivatives: bool,
    /// A build holds the grid buffer; other builders wait on `grid_built`.
    building: bool,
    stats: Option<RasterStats>,
}

/// How long a waiting builder sleeps between cancellation checks.
const BUILD_WAIT: Duration = Duration::from_millis(10);

/// Clears the in-progress flag when a build ends, including by panic.
struct BuildGuard<'a> {
    composite: &'a Composite,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        lock(&self.composite.grid).building = false;
        self.composite.grid_built.notify_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Assembles a [`Composite`].
///
/// The model and rendering options are required. The transform defaults to
/// fitting the model bounds into the viewport, and the worker pool to one
/// built from [`WorkerConfig::from_env`].
#[derive(Default)]
pub struct CompositeBuilder {
    model: Option<Arc<dyn TinModel>>,
    options: Option<RenderOptions>,
    viewport: Option<(u32, u32)>,
    transform: Option<ViewTransform>,
    task_index: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
    worker_config: Option<WorkerConfig>,
    font: Option<FontArc>,
}

impl CompositeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: Arc<dyn TinModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Viewport size in pixels.
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some((width, height));
        self
    }

    /// Model to viewport transform.
    pub fn transform(mut self, transform: ViewTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn task_index(mut self, task_index: usize) -> Self {
        self.task_index = task_index;
        self
    }

    /// Share an existing pool for grid builds.
    pub fn worker_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn worker_config(mut self, config: WorkerConfig) -> Self {
        self.worker_config = Some(config);
        self
    }

    /// Font for vertex labels. Labels are skipped without one.
    pub fn label_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn build(self) -> Result<Composite> {
        let model = self.model.ok_or(Error::MissingModel)?;
        let options = self.options.ok_or(Error::MissingOptions)?;
        options.validate()?;

        let (width, height) = self.viewport.unwrap_or((0, 0));
        if width == 0 || height == 0 {
            return Err(Error::InvalidViewport { width, height });
        }

        let transform = match self.transform {
            Some(transform) => transform,
            None => ViewTransform::fit(&model.bounds(), width, height, 0.0)?,
        };
        let window = VisibleWindow::from_viewport(&transform, width, height);

        let selector = SourceSelector::new();
        if model.is_loaded() {
            if let Some((tin, reduction)) = model.reference_tin() {
                selector.submit_candidate(tin, reduction);
            }
        }

        let config = self.worker_config.unwrap_or_default();
        let pool = match self.pool {
            Some(pool) => pool,
            None => config.build_pool()?,
        };

        tracing::debug!(
            task_index = self.task_index,
            width,
            height,
            model = model.name(),
            "Created composite"
        );

        Ok(Composite {
            task_index: self.task_index,
            model,
            options,
            width,
            height,
            transform,
            window,
            selector,
            tins: RwLock::new(TinSlots::default()),
            visible_range: Mutex::new(None),
            grid: Mutex::new(GridState::default()),
            grid_built: Condvar::new(),
            raster_image: Mutex::new(None),
            wireframe_stats: Mutex::new(None),
            pool,
            rows_per_task: config.rows_per_task,
            font: self.font,
        })
    }
}

/// Viewport, transform and rendering products for one render task.
///
/// All methods take `&self`; a composite is shared between the task that
/// owns it and the workers that sample its grid.
pub struct Composite {
    task_index: usize,
    model: Arc<dyn TinModel>,
    options: RenderOptions,
    width: u32,
    height: u32,
    transform: ViewTransform,
    window: VisibleWindow,
    selector: SourceSelector,
    tins: RwLock<TinSlots>,
    visible_range: Mutex<Option<(f64, f64)>>,
    grid: Mutex<GridState>,
    grid_built: Condvar,
    raster_image: Mutex<Option<Arc<RgbaImage>>>,
    wireframe_stats: Mutex<Option<WireframeStats>>,
    pool: Arc<rayon::ThreadPool>,
    rows_per_task: usize,
    font: Option<FontArc>,
}

impl std::fmt::Debug for Composite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composite")
            .field("task_index", &self.task_index)
            .field("model", &self.model.name())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("window", &self.window)
            .field("reduction", &self.selector.reduction_factor())
            .field("grid_complete", &self.is_grid_complete())
            .finish()
    }
}

impl Composite {
    pub fn builder() -> CompositeBuilder {
        CompositeBuilder::new()
    }

    /// A composite for a new task that reuses `prev`'s transform, viewport,
    /// model, TINs, interpolation source, visible range, and completed grid
    /// and raster image. Rendering options are always taken fresh.
    pub fn successor(prev: &Composite, options: RenderOptions, task_index: usize) -> Result<Self> {
        options.validate()?;

        let grid = {
            let state = lock(&prev.grid);
            if state.complete {
                GridState {
                    building: false,
                    ..state.clone()
                }
            } else {
                GridState::default()
            }
        };
        let raster_image = if grid.complete {
            lock(&prev.raster_image).clone()
        } else {
            None
        };
        let tins = prev.tins.read().unwrap_or_else(PoisonError::into_inner).clone();

        Ok(Self {
            task_index,
            model: Arc::clone(&prev.model),
            options,
            width: prev.width,
            height: prev.height,
            transform: prev.transform.clone(),
            window: prev.window,
            selector: SourceSelector::with_source(prev.selector.current()),
            tins: RwLock::new(tins),
            visible_range: Mutex::new(prev.visible_range()),
            grid: Mutex::new(grid),
            grid_built: Condvar::new(),
            raster_image: Mutex::new(raster_image),
            wireframe_stats: Mutex::new(None),
            pool: Arc::clone(&prev.pool),
            rows_per_task: prev.rows_per_task,
            font: prev.font.clone(),
        })
    }

    pub fn task_index(&self) -> usize {
        self.task_index
    }

    pub fn model(&self) -> &Arc<dyn TinModel> {
        &self.model
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    /// Model-space rectangle covered by the viewport, fixed at construction.
    pub fn visible_window(&self) -> VisibleWindow {
        self.window
    }

    pub fn map_model_to_viewport(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        self.transform.map_model_to_viewport(points)
    }

    pub fn map_viewport_to_model(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        self.transform.map_viewport_to_model(points)
    }

    /// Offer a refined TIN for interpolation; see [`SourceSelector`].
    pub fn submit_candidate(&self, tin: Arc<Tin>, reduction_factor: f64) -> bool {
        self.selector.submit_candidate(tin, reduction_factor)
    }

    /// Reduction factor of the interpolation TIN, infinity when none.
    pub fn interpolation_reduction(&self) -> f64 {
        self.selector.reduction_factor()
    }

    /// Whether the model is loaded and an interpolation TIN is selected.
    pub fn is_ready(&self) -> bool {
        self.model.is_loaded() && self.selector.current().is_some()
    }

    /// TIN drawn by [`Composite::render_wireframe`].
    pub fn set_wireframe_tin(&self, tin: Arc<Tin>, reduction: f64) {
        self.tins.write().unwrap_or_else(PoisonError::into_inner).wireframe = Some((tin, reduction));
    }

    /// TIN sampled by [`Composite::build_grid`].
    pub fn set_raster_tin(&self, tin: Arc<Tin>, reduction: f64) {
        self.tins.write().unwrap_or_else(PoisonError::into_inner).raster = Some((tin, reduction));
    }

    pub fn wireframe_tin(&self) -> Option<Arc<Tin>> {
        self.wireframe_source().map(|(tin, _)| tin)
    }

    pub fn raster_tin(&self) -> Option<Arc<Tin>> {
        self.raster_source().map(|(tin, _)| tin)
    }

    fn wireframe_source(&self) -> Option<(Arc<Tin>, f64)> {
        let slots = self.tins.read().unwrap_or_else(PoisonError::into_inner);
        slots.wireframe.clone().or_else(|| self.selected_source())
    }

    fn raster_source(&self) -> Option<(Arc<Tin>, f64)> {
        let slots = self.tins.read().unwrap_or_else(PoisonError::into_inner);
        slots.raster.clone().or_else(|| self.selected_source())
    }

    fn selected_source(&self) -> Option<(Arc<Tin>, f64)> {
        self.selector
            .current()
            .map(|s| (Arc::clone(s.tin()), s.reduction_factor()))
    }

    fn z_range(&self) -> (f64, f64) {
        let bounds = self.model.bounds();
        (bounds.min_z, bounds.max_z)
    }

    fn canvas(&self) -> ImageCanvas {
        let canvas = ImageCanvas::new(self.width, self.height);
        match &self.font {
            Some(font) => canvas.with_font(font.clone(), LABEL_SIZE),
            None => canvas,
        }
    }

    /// Render the wireframe TIN.
    ///
    /// `None` when neither edges nor vertices are selected, or there is no
    /// TIN to draw.
    pub fn render_wireframe(&self) -> Result<Option<WireframeImage>> {
        if !self.options.is_wireframe_selected() {
            return Ok(None);
        }
        let Some((tin, reduction)) = self.wireframe_source() else {
            return Ok(None);
        };

        let start = Instant::now();
        let style = WireframeStyle::from_options(&self.options, self.z_range())?;
        let renderer = WireframeRenderer::new(&self.transform, self.window, style);
        let mut canvas = self.canvas();
        let Some(vertex_count) = renderer.render(&tin.edges(), &mut canvas) else {
            return Ok(None);
        };
        let elapsed = start.elapsed();

        *lock(&self.wireframe_stats) = Some(WireframeStats {
            vertex_count,
            reduction,
            elapsed,
        });
        tracing::info!(
            task_index = self.task_index,
            vertex_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered wireframe"
        );

        Ok(Some(WireframeImage {
            image: canvas.into_image(),
            vertex_count,
            elapsed,
        }))
    }

    /// Draw markers, and labels when selected, for an arbitrary vertex set.
    pub fn render_points(&self, vertices: &[Vertex]) -> Result<(RgbaImage, usize)> {
        let style = WireframeStyle::from_options(&self.options, self.z_range())?;
        let renderer = WireframeRenderer::new(&self.transform, self.window, style);
        let mut canvas = self.canvas();
        let drawn = renderer.render_points(vertices, &mut canvas);
        Ok((canvas.into_image(), drawn))
    }

    /// Sample every viewport pixel on the worker pool.
    ///
    /// `derivatives` selects the regression backend, which also fills the
    /// gradient channels needed for hillshade. The raster TIN is sampled
    /// when set, otherwise the selected interpolation TIN.
    ///
    /// One build runs at a time. A concurrent caller waits for it and then
    /// reuses its grid, resuming it when it was cancelled.
    pub fn build_grid(&self, derivatives: bool, cancel: &dyn Cancellation) -> BuildOutcome {
        let Some((tin, reduction)) = self.raster_source() else {
            tracing::debug!(task_index = self.task_index, "No TIN available for grid");
            return BuildOutcome::Unavailable;
        };

        let mut grid = {
            let mut state = lock(&self.grid);
            while state.building {
                if cancel.is_cancelled() {
                    return BuildOutcome::Cancelled;
                }
                state = self
                    .grid_built
                    .wait_timeout(state, BUILD_WAIT)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            if state.complete && state.includes_derivatives == derivatives {
                return BuildOutcome::Complete;
            }
            let same_mode = state.includes_derivatives == derivatives;
            let existing = state.grid.take().filter(|_| same_mode);
            state.complete = false;
            state.includes_derivatives = derivatives;
            state.building = true;
            state.stats = None;
            match existing {
                Some(shared) => Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()),
                None => ValueGrid::new(self.width as usize, self.height as usize),
            }
        };

        let _guard = BuildGuard { composite: self };
        let start = Instant::now();
        tracing::debug!(
            task_index = self.task_index,
            derivatives,
            reduction,
            "Building grid"
        );

        let sampler = SurfaceSampler::for_mode(tin, derivatives);
        let rows = RowSampler::new(&self.transform, self.model.bounds(), self.width as usize, &sampler);
        let finished = self
            .pool
            .install(|| rows.sample_grid(&mut grid, self.rows_per_task, cancel));

        // Workers are done; publish the grid and close out the build in one step
        let mut state = lock(&self.grid);
        let outcome = if finished {
            let elapsed = start.elapsed();
            let realized = grid.value_range();
            if let Some((min, max)) = realized {
                self.record_visible_range(min, max);
            }
            state.complete = true;
            state.stats = Some(RasterStats { reduction, elapsed });
            tracing::info!(
                task_index = self.task_index,
                elapsed_ms = elapsed.as_millis() as u64,
                realized = ?realized,
                "Grid build complete"
            );
            BuildOutcome::Complete
        } else {
            tracing::debug!(task_index = self.task_index, "Grid build cancelled");
            BuildOutcome::Cancelled
        };
        state.grid = Some(Arc::new(grid));
        drop(state);
        outcome
    }

    /// The grid as last published, complete or not.
    pub fn grid_snapshot(&self) -> Option<Arc<ValueGrid>> {
        lock(&self.grid).grid.clone()
    }

    pub fn is_grid_complete(&self) -> bool {
        lock(&self.grid).complete
    }

    pub fn grid_includes_derivatives(&self) -> bool {
        lock(&self.grid).includes_derivatives
    }

    /// Composite the grid into the raster image using the current options.
    ///
    /// `None` when there is no grid yet, or hillshade is selected and the
    /// grid was sampled without derivatives.
    pub fn transfer_grid_to_image(&self) -> Result<Option<Arc<RgbaImage>>> {
        let (grid, derivatives) = {
            let state = lock(&self.grid);
            match &state.grid {
                Some(grid) => (Arc::clone(grid), state.includes_derivatives),
                None => return Ok(None),
            }
        };
        if self.options.hillshade && !derivatives {
            tracing::debug!(task_index = self.task_index, "Grid has no derivatives for hillshade");
            return Ok(None);
        }

        let compositor = RasterCompositor::from_options(&self.options, self.z_range())?;
        let image = Arc::new(compositor.render(&grid));
        *lock(&self.raster_image) = Some(Arc::clone(&image));
        Ok(Some(image))
    }

    /// Build the grid in the mode the options call for, then composite it.
    pub fn render_raster(&self, cancel: &dyn Cancellation) -> Result<Option<Arc<RgbaImage>>> {
        match self.build_grid(self.options.hillshade, cancel) {
            BuildOutcome::Complete => self.transfer_grid_to_image(),
            BuildOutcome::Cancelled | BuildOutcome::Unavailable => Ok(None),
        }
    }

    pub fn raster_image(&self) -> Option<Arc<RgbaImage>> {
        lock(&self.raster_image).clone()
    }

    /// Regression diagnostics at a viewport point.
    pub fn perform_query(&self, x: f64, y: f64) -> QueryResult {
        let source = self.selector.current();
        PointQuery::new(self.model.as_ref(), &self.transform, self.window, source.as_deref()).query(x, y)
    }

    /// Hover text for a viewport point.
    pub fn describe_point(&self, x: f64, y: f64) -> String {
        let source = self.selector.current();
        PointQuery::new(self.model.as_ref(), &self.transform, self.window, source.as_deref()).describe(x, y)
    }

    /// Widen the accumulated range of rendered values.
    pub fn record_visible_range(&self, min: f64, max: f64) {
        let mut range = lock(&self.visible_range);
        *range = Some(match *range {
            Some((lo, hi)) => (lo.min(min), hi.max(max)),
            None => (min, max),
        });
    }

    /// Accumulated range of rendered values, `None` before any was recorded.
    pub fn visible_range(&self) -> Option<(f64, f64)> {
        *lock(&self.visible_range)
    }

    /// Color bar for the palette, value range and colors in the options.
    pub fn render_legend(&self) -> Result<Option<RgbaImage>> {
        let palette = self.options.palette()?;
        let (min, max) = self.z_range();
        let (min, max) = self.options.value_range_or(min, max);
        let style = ColorBarStyle::from_options(&self.options);
        Ok(render_color_bar(&palette, min, max, &style))
    }

    /// Model summary and the state of each rendering product.
    pub fn report(&self) -> String {
        let wireframe = *lock(&self.wireframe_stats);
        let raster = lock(&self.grid).stats;
        build_report(
            self.model.as_ref(),
            wireframe.as_ref(),
            raster.as_ref(),
            self.visible_range(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::NeverCancel;
    use crate::model::TinSurfaceModel;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn lattice(cells: usize, spacing: f64, z: impl Fn(f64, f64) -> f64) -> Arc<Tin> {
        let mut vs = Vec::new();
        for i in 0..=cells {
            for j in 0..=cells {
                let x = i as f64 * spacing + 0.013 * ((j * 7 + i * 3) % 5) as f64;
                let y = j as f64 * spacing + 0.011 * ((i * 5 + j * 2) % 7) as f64;
                vs.push(Vertex::new(x, y, z(x, y), vs.len() as i32));
            }
        }
        Arc::new(Tin::from_vertices(vs).unwrap())
    }

    fn small_pool() -> WorkerConfig {
        WorkerConfig {
            worker_threads: 2,
            rows_per_task: 4,
        }
    }

    fn composite(options: RenderOptions) -> Composite {
        let tin = lattice(4, 10.0, |x, y| x + 2.0 * y);
        Composite::builder()
            .model(Arc::new(TinSurfaceModel::new("plane", tin)))
            .options(options)
            .viewport(40, 40)
            .transform(ViewTransform::from_scale_translate(1.0, -1.0, 0.0, 40.0).unwrap())
            .worker_config(small_pool())
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_model_and_options() {
        let tin = lattice(2, 1.0, |_, _| 0.0);
        let err = Composite::builder().options(RenderOptions::default()).viewport(4, 4).build();
        assert!(matches!(err, Err(Error::MissingModel)));

        let err = Composite::builder()
            .model(Arc::new(TinSurfaceModel::new("m", Arc::clone(&tin))))
            .viewport(4, 4)
            .build();
        assert!(matches!(err, Err(Error::MissingOptions)));

        let err = Composite::builder()
            .model(Arc::new(TinSurfaceModel::new("m", tin)))
            .options(RenderOptions::default())
            .viewport(0, 4)
            .build();
        assert!(matches!(err, Err(Error::InvalidViewport { width: 0, height: 4 })));
    }

    #[test]
    fn loaded_model_seeds_selection() {
        let c = composite(RenderOptions::default());
        assert!(c.is_ready());
        assert_eq!(c.interpolation_reduction(), 1.0);
        assert!(!c.submit_candidate(lattice(2, 20.0, |_, _| 0.0), 4.0));
    }

    #[test]
    fn visible_range_only_widens() {
        let c = composite(RenderOptions::default());
        assert_eq!(c.visible_range(), None);
        c.record_visible_range(2.0, 5.0);
        c.record_visible_range(3.0, 4.0);
        assert_eq!(c.visible_range(), Some((2.0, 5.0)));
        c.record_visible_range(-1.0, 6.0);
        assert_eq!(c.visible_range(), Some((-1.0, 6.0)));
    }

    #[test]
    fn completed_grid_records_range_and_is_reused() {
        let c = composite(RenderOptions::default());
        assert!(!c.is_grid_complete());
        assert_eq!(c.build_grid(false, &NeverCancel), BuildOutcome::Complete);
        assert!(c.is_grid_complete());
        let (min, max) = c.visible_range().unwrap();
        assert!(min >= 0.0 && max <= 120.5 && min < max);

        let first = c.grid_snapshot().unwrap();
        assert_eq!(c.build_grid(false, &NeverCancel), BuildOutcome::Complete);
        assert!(Arc::ptr_eq(&first, &c.grid_snapshot().unwrap()));
    }

    #[test]
    fn cancelled_build_is_not_complete() {
        let c = composite(RenderOptions::default());
        let cancel = AtomicBool::new(true);
        assert_eq!(c.build_grid(false, &cancel), BuildOutcome::Cancelled);
        assert!(!c.is_grid_complete());
        assert!(c.grid_snapshot().unwrap().cells().all(|cell| cell[0].is_nan()));
        assert_eq!(c.visible_range(), None);
        assert!(c.report().matches("Not Available").count() == 2);
    }

    /// Counts row polls; holds every poll until `release` is set.
    struct GatedRows<'a> {
        polls: AtomicUsize,
        release: &'a AtomicBool,
    }

    impl Cancellation for GatedRows<'_> {
        fn is_cancelled(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst);
            while !self.release.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            false
        }
    }

    /// Signals `waiting` on every poll and counts polls made once the first
    /// builder has reached its last row.
    struct Follower<'a> {
        waiting: &'a AtomicBool,
        leader: &'a GatedRows<'a>,
        rows: usize,
        late_polls: AtomicUsize,
    }

    impl Cancellation for Follower<'_> {
        fn is_cancelled(&self) -> bool {
            self.waiting.store(true, Ordering::SeqCst);
            if self.leader.polls.load(Ordering::SeqCst) >= self.rows {
                self.late_polls.fetch_add(1, Ordering::SeqCst);
            }
            false
        }
    }

    #[test]
    fn concurrent_builds_share_one_grid() {
        let c = composite(RenderOptions::default());
        let rows = 40;
        let release = AtomicBool::new(false);
        let waiting = AtomicBool::new(false);
        let leader = GatedRows {
            polls: AtomicUsize::new(0),
            release: &release,
        };
        let follower = Follower {
            waiting: &waiting,
            leader: &leader,
            rows,
            late_polls: AtomicUsize::new(0),
        };

        let (first, second) = std::thread::scope(|s| {
            let a = s.spawn(|| c.build_grid(true, &leader));
            while leader.polls.load(Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            let b = s.spawn(|| c.build_grid(true, &follower));
            while !waiting.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            release.store(true, Ordering::SeqCst);
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(first, BuildOutcome::Complete);
        assert_eq!(second, BuildOutcome::Complete);
        assert_eq!(leader.polls.load(Ordering::SeqCst), rows);
        assert!(follower.late_polls.load(Ordering::SeqCst) < rows);
        assert!(c.is_grid_complete());
    }

    #[test]
    fn waiting_builder_honours_cancellation() {
        let c = composite(RenderOptions::default());
        let release = AtomicBool::new(false);
        let leader = GatedRows {
            polls: AtomicUsize::new(0),
            release: &release,
        };

        let (first, second) = std::thread::scope(|s| {
            let a = s.spawn(|| c.build_grid(false, &leader));
            while leader.polls.load(Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            let second = c.build_grid(false, &AtomicBool::new(true));
            release.store(true, Ordering::SeqCst);
            (a.join().unwrap(), second)
        });

        assert_eq!(first, BuildOutcome::Complete);
        assert_eq!(second, BuildOutcome::Cancelled);
        assert!(c.is_grid_complete());
    }

    #[test]
    fn hillshade_needs_derivative_grid() {
        let options = RenderOptions {
            hillshade: true,
            ..RenderOptions::default()
        };
        let c = composite(options);
        c.build_grid(false, &NeverCancel);
        assert!(c.transfer_grid_to_image().unwrap().is_none());

        let image = c.render_raster(&NeverCancel).unwrap().unwrap();
        assert_eq!(image.dimensions(), (40, 40));
        assert!(c.grid_includes_derivatives());
        assert!(c.raster_image().is_some());
    }

    #[test]
    fn successor_carries_products() {
        let c = composite(RenderOptions::default());
        c.build_grid(false, &NeverCancel);
        c.transfer_grid_to_image().unwrap();
        c.record_visible_range(-50.0, -40.0);

        let next = Composite::successor(&c, RenderOptions::default(), 7).unwrap();
        assert_eq!(next.task_index(), 7);
        assert_eq!(next.transform(), c.transform());
        assert_eq!(next.visible_window(), c.visible_window());
        assert!(next.is_grid_complete());
        assert!(Arc::ptr_eq(&next.grid_snapshot().unwrap(), &c.grid_snapshot().unwrap()));
        assert!(next.raster_image().is_some());
        assert_eq!(next.visible_range().unwrap().0, -50.0);
        assert_eq!(next.interpolation_reduction(), 1.0);
    }

    #[test]
    fn successor_skips_incomplete_grid() {
        let c = composite(RenderOptions::default());
        c.build_grid(false, &AtomicBool::new(true));
        let next = Composite::successor(&c, RenderOptions::default(), 1).unwrap();
        assert!(next.grid_snapshot().is_none());
        assert!(next.raster_image().is_none());
    }

    #[test]
    fn wireframe_uses_dedicated_tin() {
        let c = composite(RenderOptions {
            draw_vertices: true,
            ..RenderOptions::default()
        });
        let coarse = lattice(1, 40.0, |_, _| 0.0);
        c.set_wireframe_tin(Arc::clone(&coarse), 16.0);
        let wireframe = c.render_wireframe().unwrap().unwrap();
        assert_eq!(wireframe.image.dimensions(), (40, 40));
        assert!(c.report().contains("16 to 1"));

        let hidden = composite(RenderOptions {
            draw_edges: false,
            ..RenderOptions::default()
        });
        assert!(hidden.render_wireframe().unwrap().is_none());
    }

    #[test]
    fn legend_follows_options() {
        let c = composite(RenderOptions {
            background: [0, 0, 64, 255],
            ..RenderOptions::default()
        });
        let legend = c.render_legend().unwrap().unwrap();
        assert_eq!(legend.get_pixel(1, 50).0, [0, 0, 64, 255]);
        let flat = composite(RenderOptions {
            value_range: Some([3.0, 3.0]),
            ..RenderOptions::default()
        });
        assert!(flat.render_legend().unwrap().is_none());
    }
}
