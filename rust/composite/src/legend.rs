// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legend color bar.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::options::RenderOptions;
use crate::palette::Palette;

/// Layout of a color bar image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBarStyle {
    /// Width of the ramp in pixels
    pub width: u32,
    /// Height of the ramp in pixels
    pub height: u32,
    /// Space around the ramp
    pub margin: u32,
    pub background: Rgba<u8>,
    /// Color of the framing rectangle; no frame when `None`
    pub frame: Option<Rgba<u8>>,
}

impl Default for ColorBarStyle {
    fn default() -> Self {
        Self {
            width: 50,
            height: 100,
            margin: 5,
            background: Rgba([255, 255, 255, 255]),
            frame: Some(Rgba([0, 0, 0, 255])),
        }
    }
}

impl ColorBarStyle {
    /// Default layout, framed in the wireframe ink over the legend background.
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            background: Rgba(options.background),
            frame: Some(Rgba(options.foreground)),
            ..Self::default()
        }
    }
}

/// Render a vertical ramp with `max` at the top and `min` at the bottom.
///
/// Returns `None` when the range is empty or not finite, or the ramp has no
/// area.
pub fn render_color_bar(palette: &dyn Palette, min: f64, max: f64, style: &ColorBarStyle) -> Option<RgbaImage> {
    if !(min.is_finite() && max.is_finite()) || min == max || style.width == 0 || style.height == 0 {
        return None;
    }

    let total_width = style.width + 2 * style.margin;
    let total_height = style.height + 2 * style.margin;
    let mut image = RgbaImage::new(total_width, total_height);
    draw_filled_rect_mut(
        &mut image,
        Rect::at(0, 0).of_size(total_width, total_height),
        style.background,
    );

    let span = (style.height - 1).max(1) as f64;
    for row in 0..style.height {
        let value = max - (row as f64 / span) * (max - min);
        let color = palette.rgba_for(value, min.min(max), min.max(max));
        let y = (style.margin + row) as i32;
        draw_filled_rect_mut(
            &mut image,
            Rect::at(style.margin as i32, y).of_size(style.width, 1),
            color,
        );
    }

    if let Some(frame) = style.frame {
        draw_hollow_rect_mut(
            &mut image,
            Rect::at(style.margin as i32 - 1, style.margin as i32 - 1).of_size(style.width + 2, style.height + 2),
            frame,
        );
    }

    Some(image)
}
