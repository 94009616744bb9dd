// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing surface for wireframe output.
//!
//! Coordinates are viewport pixels with the origin at the top-left corner.

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_ellipse_mut, draw_line_segment_mut, draw_text_mut, BresenhamLineIter};

/// Diameter of a vertex marker in pixels.
pub const MARKER_SIZE: i32 = 5;

/// Offset of a label's origin from its vertex.
pub const LABEL_OFFSET: (f32, f32) = (3.0, -3.0);

/// Ink for a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Rgba<u8>),
    /// Linear blend from the color at `from` to the color at `to`.
    Gradient(Rgba<u8>, Rgba<u8>),
}

/// Primitive drawing operations used by the wireframe renderer.
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), paint: Paint);

    /// Filled circular marker centered on `center`.
    fn fill_marker(&mut self, center: (f32, f32), color: Rgba<u8>);

    /// Text whose baseline starts near `anchor`.
    fn draw_label(&mut self, anchor: (f32, f32), text: &str, color: Rgba<u8>);
}

/// A [`Canvas`] backed by an RGBA image.
///
/// The image starts fully transparent. Labels need a font; without one
/// they are skipped.
pub struct ImageCanvas {
    image: RgbaImage,
    font: Option<FontArc>,
    label_scale: PxScale,
}

impl ImageCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            font: None,
            label_scale: PxScale::from(12.0),
        }
    }

    pub fn with_font(mut self, font: FontArc, size: f32) -> Self {
        self.font = Some(font);
        self.label_scale = PxScale::from(size);
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn put(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl std::fmt::Debug for ImageCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCanvas")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Canvas for ImageCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), paint: Paint) {
        let max = (self.image.width() as f32, self.image.height() as f32);
        let Some((a, b)) = clip_segment(from, to, (0.0, 0.0), max) else {
            return;
        };

        match paint {
            Paint::Solid(color) => draw_line_segment_mut(&mut self.image, a, b, color),
            Paint::Gradient(start, end) => {
                // Blend by position along the unclipped segment
                let length = distance(from, to);
                let t0 = if length > 0.0 { distance(from, a) / length } else { 0.0 };
                let t1 = if length > 0.0 { distance(from, b) / length } else { 0.0 };
                let pixels: Vec<(i32, i32)> = BresenhamLineIter::new(a, b).collect();
                let last = pixels.len().saturating_sub(1).max(1) as f32;
                for (i, (x, y)) in pixels.into_iter().enumerate() {
                    let t = t0 + (t1 - t0) * (i as f32 / last);
                    self.put(x, y, blend(start, end, t));
                }
            }
        }
    }

    fn fill_marker(&mut self, center: (f32, f32), color: Rgba<u8>) {
        let radius = MARKER_SIZE / 2;
        let center = (center.0.floor() as i32, center.1.floor() as i32);
        draw_filled_ellipse_mut(&mut self.image, center, radius, radius, color);
    }

    fn draw_label(&mut self, anchor: (f32, f32), text: &str, color: Rgba<u8>) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let x = (anchor.0 + LABEL_OFFSET.0).round() as i32;
        let y = (anchor.1 + LABEL_OFFSET.1 - self.label_scale.y).round() as i32;
        draw_text_mut(&mut self.image, color, x, y, self.label_scale, font, text);
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn blend(start: Rgba<u8>, end: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let value = start.0[i] as f32 + (end.0[i] as f32 - start.0[i] as f32) * t;
        *channel = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Cohen-Sutherland clip of a segment to the rectangle `[min, max]`.
fn clip_segment(
    mut a: (f32, f32),
    mut b: (f32, f32),
    min: (f32, f32),
    max: (f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    const LEFT: u8 = 1;
    const RIGHT: u8 = 2;
    const BOTTOM: u8 = 4;
    const TOP: u8 = 8;

    let outcode = |p: (f32, f32)| -> u8 {
        let mut c = 0;
        if p.0 < min.0 {
            c |= LEFT;
        } else if p.0 > max.0 {
            c |= RIGHT;
        }
        if p.1 < min.1 {
            c |= BOTTOM;
        } else if p.1 > max.1 {
            c |= TOP;
        }
        c
    };

    if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
        return None;
    }

    let mut code_a = outcode(a);
    let mut code_b = outcode(b);

    loop {
        if (code_a | code_b) == 0 {
            return Some((a, b));
        }
        if (code_a & code_b) != 0 {
            return None;
        }

        let code_out = if code_a != 0 { code_a } else { code_b };

        let p = if (code_out & TOP) != 0 {
            (a.0 + (b.0 - a.0) * (max.1 - a.1) / (b.1 - a.1), max.1)
        } else if (code_out & BOTTOM) != 0 {
            (a.0 + (b.0 - a.0) * (min.1 - a.1) / (b.1 - a.1), min.1)
        } else if (code_out & RIGHT) != 0 {
            (max.0, a.1 + (b.1 - a.1) * (max.0 - a.0) / (b.0 - a.0))
        } else {
            (min.0, a.1 + (b.1 - a.1) * (min.0 - a.0) / (b.0 - a.0))
        };

        if code_out == code_a {
            a = p;
            code_a = outcode(a);
        } else {
            b = p;
            code_b = outcode(b);
        }
    }
}
