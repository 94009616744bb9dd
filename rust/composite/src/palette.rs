// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value-to-color mapping.
//!
//! Palettes are looked up by name from a small registry of piecewise-linear
//! gradients.

use image::{Rgb, Rgba};

/// Maps a value within `[min, max]` to a color.
pub trait Palette: Send + Sync {
    fn color_for(&self, value: f64, min: f64, max: f64) -> Rgb<u8>;

    /// Opaque RGBA form of [`Palette::color_for`].
    fn rgba_for(&self, value: f64, min: f64, max: f64) -> Rgba<u8> {
        let Rgb([r, g, b]) = self.color_for(value, min, max);
        Rgba([r, g, b, 255])
    }
}

/// A gradient through evenly spaced color stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientPalette {
    name: &'static str,
    stops: &'static [[u8; 3]],
}

const GRAYSCALE: &[[u8; 3]] = &[[0, 0, 0], [255, 255, 255]];

const RAINBOW: &[[u8; 3]] = &[
    [0, 0, 255],
    [0, 255, 255],
    [0, 255, 0],
    [255, 255, 0],
    [255, 0, 0],
];

const TERRAIN: &[[u8; 3]] = &[
    [0, 97, 71],
    [16, 122, 47],
    [232, 215, 125],
    [161, 67, 0],
    [130, 30, 30],
    [161, 161, 161],
    [206, 206, 206],
    [255, 255, 255],
];

const BLUE_RED: &[[u8; 3]] = &[[5, 48, 97], [247, 247, 247], [103, 0, 31]];

impl GradientPalette {
    /// Built-in palette names (case-sensitive).
    pub const SUPPORTED: &'static [&'static str] = &["grayscale", "rainbow", "terrain", "blue-red"];

    pub fn by_name(name: &str) -> Option<Self> {
        let stops = match name {
            "grayscale" => GRAYSCALE,
            "rainbow" => RAINBOW,
            "terrain" => TERRAIN,
            "blue-red" => BLUE_RED,
            _ => return None,
        };
        let name = Self::SUPPORTED.iter().copied().find(|n| *n == name)?;
        Some(Self { name, stops })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Color at parameter `t` in `[0, 1]`.
    fn sample(&self, t: f64) -> Rgb<u8> {
        let segments = (self.stops.len() - 1) as f64;
        let s = t * segments;
        let i = (s.floor() as usize).min(self.stops.len() - 2);
        let f = s - i as f64;
        let (a, b) = (self.stops[i], self.stops[i + 1]);
        let mix = |p: u8, q: u8| (p as f64 + (q as f64 - p as f64) * f).round().clamp(0.0, 255.0) as u8;
        Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
    }
}

impl Palette for GradientPalette {
    /// Values outside the range are clamped to the end colors. A degenerate
    /// range maps everything to the middle of the gradient.
    fn color_for(&self, value: f64, min: f64, max: f64) -> Rgb<u8> {
        let t = if max > min { (value - min) / (max - min) } else { 0.5 };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.sample(t)
    }
}
