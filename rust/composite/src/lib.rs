// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # TinView Composite
//!
//! Turns a TIN surface into viewport-sized images and answers point
//! queries against it.
//!
//! A [`Composite`] is created per render task with a fixed viewport and an
//! axis-aligned model-to-viewport transform. Refined TINs are offered with
//! [`Composite::submit_candidate`]; only finer ones replace the current
//! interpolation source. From there a composite can:
//!
//! - draw a clipped wireframe with deduplicated vertex markers
//! - sample a per-pixel value grid on a rayon pool, optionally with the
//!   partial derivatives needed for hillshade
//! - composite the grid into a palette-mapped or hillshaded raster
//! - report regression diagnostics (slope, curvature, steepest descent,
//!   prediction interval) for a viewport point
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use tinview_composite::{Composite, RenderOptions, TinSurfaceModel};
//! use tinview_tin::{Tin, Vertex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tin = Arc::new(Tin::from_vertices(vec![
//!     Vertex::new(0.0, 0.0, 1.0, 0),
//!     Vertex::new(100.0, 0.0, 2.0, 1),
//!     Vertex::new(0.0, 100.0, 3.0, 2),
//!     Vertex::new(100.0, 100.0, 4.0, 3),
//! ])?);
//! let composite = Composite::builder()
//!     .model(Arc::new(TinSurfaceModel::new("demo", tin)))
//!     .options(RenderOptions::default())
//!     .viewport(256, 256)
//!     .build()?;
//!
//! if let Some(raster) = composite.render_raster(&AtomicBool::new(false))? {
//!     println!("raster {}x{}", raster.width(), raster.height());
//! }
//! let query = composite.perform_query(128.0, 128.0);
//! println!("{}", query.text);
//! # Ok(())
//! # }
//! ```

pub mod canvas;
pub mod composite;
pub mod config;
pub mod error;
pub mod grid;
pub mod hillshade;
pub mod legend;
pub mod model;
pub mod options;
pub mod palette;
pub mod query;
pub mod report;
pub mod selector;
pub mod transform;
pub mod wireframe;

pub use canvas::{Canvas, ImageCanvas, Paint};
pub use composite::{Composite, CompositeBuilder, WireframeImage};
pub use config::WorkerConfig;
pub use error::{Error, Result};
pub use grid::{BuildOutcome, Cancellation, NeverCancel, RowSampler, SurfaceSampler, ValueGrid};
pub use hillshade::{intensity, light_vector, RasterCompositor};
pub use legend::{render_color_bar, ColorBarStyle};
pub use model::{TinModel, TinSurfaceModel};
pub use options::{HillshadeOptions, LabelField, RenderOptions};
pub use palette::{GradientPalette, Palette};
pub use query::{PointQuery, QueryResult, SurfaceDerivatives};
pub use report::{format_reduction, RasterStats, WireframeStats};
pub use selector::{InterpolationSource, SourceSelector};
pub use transform::{ViewTransform, VisibleWindow};
pub use wireframe::{VertexBitmap, WireframeRenderer, WireframeStyle};
