// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster compositing of a sampled grid: palette mapping and hillshade.

use image::{Rgba, RgbaImage};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::ValueGrid;
use crate::options::{HillshadeOptions, RenderOptions};
use crate::palette::{GradientPalette, Palette};

/// Plain-mode color for cells without data.
pub const NO_DATA: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Hillshade color for cells without data.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Unit vector pointing at a light source.
///
/// `azimuth` is a compass bearing in degrees (clockwise from north) and
/// `elevation` is measured up from the horizon.
pub fn light_vector(azimuth: f64, elevation: f64) -> Vector3<f64> {
    let theta = (90.0 - azimuth).to_radians();
    let phi = elevation.to_radians();
    Vector3::new(theta.cos() * phi.cos(), theta.sin() * phi.cos(), phi.sin())
}

/// Illumination of a surface with gradient `(dzdx, dzdy)`.
///
/// Surfaces facing away from the light receive exactly `ambient`.
pub fn intensity(ambient: f64, light: &Vector3<f64>, dzdx: f64, dzdy: f64) -> f64 {
    let normal = Vector3::new(-dzdx, -dzdy, 1.0).normalize();
    let cosine = normal.dot(light);
    if cosine < 0.0 {
        ambient
    } else {
        ambient + (1.0 - ambient) * cosine
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Shading {
    light: Vector3<f64>,
    ambient: f64,
    /// Palette color scaled by intensity when set, gray otherwise
    colorize: bool,
}

/// Turns a [`ValueGrid`] into an RGBA raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterCompositor {
    palette: GradientPalette,
    range: (f64, f64),
    shading: Option<Shading>,
}

impl RasterCompositor {
    /// Plain palette mapping of the value channel.
    pub fn plain(palette: GradientPalette, range: (f64, f64)) -> Self {
        Self {
            palette,
            range,
            shading: None,
        }
    }

    pub fn hillshade(palette: GradientPalette, range: (f64, f64), options: &HillshadeOptions, colorize: bool) -> Self {
        Self {
            palette,
            range,
            shading: Some(Shading {
                light: light_vector(options.azimuth, options.elevation),
                ambient: options.ambient,
                colorize,
            }),
        }
    }

    /// Compositor for `options`; `z_range` is used when no override is set.
    pub fn from_options(options: &RenderOptions, z_range: (f64, f64)) -> Result<Self> {
        let palette = options.palette()?;
        let range = options.value_range_or(z_range.0, z_range.1);
        Ok(if options.hillshade {
            Self::hillshade(palette, range, &options.shading, options.raster)
        } else {
            Self::plain(palette, range)
        })
    }

    pub fn is_hillshade(&self) -> bool {
        self.shading.is_some()
    }

    /// Color of one `[value, dz/dx, dz/dy]` cell.
    pub fn pixel(&self, cell: [f32; 3]) -> Rgba<u8> {
        let [value, dzdx, dzdy] = cell;
        let (min, max) = self.range;
        match &self.shading {
            None if value.is_nan() => NO_DATA,
            None => self.palette.rgba_for(value as f64, min, max),
            Some(_) if value.is_nan() => TRANSPARENT,
            Some(shading) => {
                let c = intensity(shading.ambient, &shading.light, dzdx as f64, dzdy as f64);
                if shading.colorize {
                    let rgb = self.palette.color_for(value as f64, min, max).0;
                    Rgba([
                        (rgb[0] as f64 * c) as u8,
                        (rgb[1] as f64 * c) as u8,
                        (rgb[2] as f64 * c) as u8,
                        255,
                    ])
                } else {
                    let g = (c * 255.0) as u8;
                    Rgba([g, g, g, 255])
                }
            }
        }
    }

    pub fn render(&self, grid: &ValueGrid) -> RgbaImage {
        let width = grid.width();
        let mut image = RgbaImage::new(width as u32, grid.height() as u32);
        if width == 0 {
            return image;
        }
        let bytes: &mut [u8] = &mut image;
        bytes.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
            let color = self.pixel(grid.cell(i % width, i / width));
            px.copy_from_slice(&color.0);
        });
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gray() -> GradientPalette {
        GradientPalette::by_name("grayscale").unwrap()
    }

    #[test]
    fn light_vector_uses_compass_bearing() {
        let north = light_vector(0.0, 0.0);
        assert_abs_diff_eq!(north.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(north.y, 1.0, epsilon = 1e-12);
        let east = light_vector(90.0, 0.0);
        assert_abs_diff_eq!(east.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(east.y, 0.0, epsilon = 1e-12);
        let overhead = light_vector(123.0, 90.0);
        assert_abs_diff_eq!(overhead.z, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(light_vector(315.0, 30.0).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn light_below_horizon_gives_exactly_ambient() {
        let light = light_vector(315.0, -10.0);
        assert_eq!(intensity(0.2, &light, 0.0, 0.0), 0.2);
    }

    #[test]
    fn overhead_light_on_flat_surface_is_full() {
        let light = light_vector(0.0, 90.0);
        assert_abs_diff_eq!(intensity(0.25, &light, 0.0, 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn slope_facing_light_is_brighter() {
        let light = light_vector(270.0, 30.0); // from the west
        // descending toward the west faces the light
        let facing = intensity(0.1, &light, 1.0, 0.0);
        let away = intensity(0.1, &light, -1.0, 0.0);
        assert!(facing > away);
    }

    #[test]
    fn no_data_colors() {
        let plain = RasterCompositor::plain(gray(), (0.0, 1.0));
        assert_eq!(plain.pixel([f32::NAN; 3]), NO_DATA);

        let shaded = RasterCompositor::hillshade(gray(), (0.0, 1.0), &HillshadeOptions::default(), true);
        assert_eq!(shaded.pixel([f32::NAN; 3]), TRANSPARENT);
    }

    #[test]
    fn gray_hillshade_scales_by_intensity() {
        let options = HillshadeOptions {
            ambient: 0.2,
            azimuth: 0.0,
            elevation: -10.0,
        };
        let shaded = RasterCompositor::hillshade(gray(), (0.0, 1.0), &options, false);
        assert_eq!(shaded.pixel([0.5, 0.0, 0.0]), Rgba([51, 51, 51, 255]));
    }

    #[test]
    fn colorized_hillshade_scales_palette() {
        let options = HillshadeOptions {
            ambient: 0.5,
            azimuth: 0.0,
            elevation: -10.0,
        };
        let shaded = RasterCompositor::hillshade(gray(), (0.0, 1.0), &options, true);
        assert_eq!(shaded.pixel([1.0, 0.0, 0.0]), Rgba([127, 127, 127, 255]));
    }

    #[test]
    fn render_maps_every_cell() {
        let grid = ValueGrid::new(3, 2);
        let image = RasterCompositor::plain(gray(), (0.0, 1.0)).render(&grid);
        assert_eq!(image.dimensions(), (3, 2));
        assert!(image.pixels().all(|p| *p == NO_DATA));
    }

    #[test]
    fn from_options_picks_mode() {
        let mut options = RenderOptions::default();
        assert!(!RasterCompositor::from_options(&options, (0.0, 1.0)).unwrap().is_hillshade());
        options.hillshade = true;
        assert!(RasterCompositor::from_options(&options, (0.0, 1.0)).unwrap().is_hillshade());
    }
}
