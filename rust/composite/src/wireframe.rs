// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wireframe rendering: edge clipping and vertex deduplication.

use image::Rgba;
use tinview_tin::{Edge, Vertex};

use crate::canvas::{Canvas, Paint};
use crate::error::Result;
use crate::options::{LabelField, RenderOptions};
use crate::palette::{GradientPalette, Palette};
use crate::transform::{ViewTransform, VisibleWindow};

/// One bit per non-negative vertex index.
#[derive(Debug, Clone, Default)]
pub struct VertexBitmap {
    words: Vec<u64>,
}

impl VertexBitmap {
    /// Bitmap able to hold indices `0..=max_index`. Empty when negative.
    pub fn with_max_index(max_index: i32) -> Self {
        let bits = if max_index < 0 { 0 } else { max_index as usize + 1 };
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    /// Mark `index`. Negative and out-of-range indices are ignored.
    pub fn set(&mut self, index: i32) {
        if let Some((word, bit)) = self.slot(index) {
            self.words[word] |= bit;
        }
    }

    pub fn get(&self, index: i32) -> bool {
        self.slot(index)
            .map_or(false, |(word, bit)| self.words[word] & bit != 0)
    }

    /// Clear `index`, returning whether it was set.
    pub fn take(&mut self, index: i32) -> bool {
        match self.slot(index) {
            Some((word, bit)) if self.words[word] & bit != 0 => {
                self.words[word] &= !bit;
                true
            }
            _ => false,
        }
    }

    fn slot(&self, index: i32) -> Option<(usize, u64)> {
        if index < 0 {
            return None;
        }
        let index = index as usize;
        let word = index / 64;
        (word < self.words.len()).then(|| (word, 1u64 << (index % 64)))
    }
}

/// The wireframe parts of the rendering options, resolved for drawing.
#[derive(Debug, Clone)]
pub struct WireframeStyle {
    pub draw_edges: bool,
    pub draw_vertices: bool,
    pub draw_labels: bool,
    pub label_field: LabelField,
    pub foreground: Rgba<u8>,
    /// Color edges and markers by value when set
    pub palette: Option<GradientPalette>,
    pub value_range: (f64, f64),
}

impl WireframeStyle {
    /// Resolve from options; `z_range` is used when no override is set.
    pub fn from_options(options: &RenderOptions, z_range: (f64, f64)) -> Result<Self> {
        let palette = if options.palette_for_wireframe {
            Some(options.palette()?)
        } else {
            None
        };
        Ok(Self {
            draw_edges: options.draw_edges,
            draw_vertices: options.draw_vertices,
            draw_labels: options.draw_labels,
            label_field: options.label_field,
            foreground: Rgba(options.foreground),
            palette,
            value_range: options.value_range_or(z_range.0, z_range.1),
        })
    }

    fn ink(&self, z: f64) -> Rgba<u8> {
        match &self.palette {
            Some(palette) => palette.rgba_for(z, self.value_range.0, self.value_range.1),
            None => self.foreground,
        }
    }

    fn label(&self, v: &Vertex) -> Option<String> {
        match self.label_field {
            LabelField::Id if v.is_indexed() => Some(v.index.to_string()),
            LabelField::Id => None,
            LabelField::Value => Some(format!("{:5.3}", v.z)),
        }
    }
}

/// Draws a TIN's edges and vertices clipped to a visible window.
#[derive(Debug, Clone)]
pub struct WireframeRenderer<'a> {
    transform: &'a ViewTransform,
    window: VisibleWindow,
    style: WireframeStyle,
}

impl<'a> WireframeRenderer<'a> {
    pub fn new(transform: &'a ViewTransform, window: VisibleWindow, style: WireframeStyle) -> Self {
        Self {
            transform,
            window,
            style,
        }
    }

    /// Render `edges` onto `canvas`.
    ///
    /// Returns the number of edge endpoints inside the visible window,
    /// counted once per incident edge whichever of edges or vertices is
    /// drawn, or `None` when neither is selected.
    pub fn render<C: Canvas>(&self, edges: &[Edge], canvas: &mut C) -> Option<usize> {
        let style = &self.style;
        if !style.draw_edges && !style.draw_vertices {
            return None;
        }

        let max_index = edges
            .iter()
            .flat_map(|e| [e.a, e.b])
            .flatten()
            .map(|v| v.index)
            .max()
            .unwrap_or(Vertex::UNINDEXED);
        let mut seen = VertexBitmap::with_max_index(max_index);
        let mut included = 0;

        if style.draw_edges {
            for (a, b) in edges.iter().filter_map(Edge::endpoints) {
                let code_a = self.window.outcode_of(&a);
                let code_b = self.window.outcode_of(&b);
                if VisibleWindow::trivially_rejects(code_a, code_b) {
                    continue;
                }
                let from = self.to_viewport(&a);
                let to = self.to_viewport(&b);
                let paint = match style.palette {
                    Some(_) => Paint::Gradient(style.ink(a.z), style.ink(b.z)),
                    None => Paint::Solid(style.foreground),
                };
                canvas.draw_line(from, to, paint);

                for (v, code) in [(a, code_a), (b, code_b)] {
                    if code == 0 {
                        seen.set(v.index);
                        included += 1;
                    }
                }
            }
        } else {
            for (a, b) in edges.iter().filter_map(Edge::endpoints) {
                for v in [a, b] {
                    if self.window.contains(v.x, v.y) {
                        seen.set(v.index);
                        included += 1;
                    }
                }
            }
        }

        if style.draw_vertices {
            for (a, b) in edges.iter().filter_map(Edge::endpoints) {
                for v in [a, b] {
                    let eligible = if v.is_indexed() {
                        seen.take(v.index)
                    } else {
                        self.window.contains(v.x, v.y)
                    };
                    if eligible {
                        self.draw_vertex(&v, canvas);
                    }
                }
            }
        }

        Some(included)
    }

    /// Render markers for `vertices` whose viewport position lies on the
    /// canvas. Returns the number drawn.
    pub fn render_points<C: Canvas>(&self, vertices: &[Vertex], canvas: &mut C) -> usize {
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        let mut drawn = 0;
        for v in vertices {
            let (x, y) = self.to_viewport(v);
            if (0.0..=width).contains(&x) && (0.0..=height).contains(&y) {
                self.draw_vertex(v, canvas);
                drawn += 1;
            }
        }
        drawn
    }

    fn draw_vertex<C: Canvas>(&self, v: &Vertex, canvas: &mut C) {
        let at = self.to_viewport(v);
        let color = self.style.ink(v.z);
        canvas.fill_marker(at, color);
        if self.style.draw_labels {
            if let Some(text) = self.style.label(v) {
                canvas.draw_label(at, &text, color);
            }
        }
    }

    fn to_viewport(&self, v: &Vertex) -> (f32, f32) {
        let (x, y) = self.transform.model_to_viewport(v.x, v.y);
        (x as f32, y as f32)
    }
}
