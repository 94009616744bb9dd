// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rendering options supplied with each composite.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::palette::GradientPalette;

/// Which vertex attribute is written next to a vertex marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelField {
    /// The vertex index, as an integer.
    #[default]
    Id,
    /// The vertex value, three decimals.
    Value,
}

/// Directional lighting for hillshade rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillshadeOptions {
    /// Share of illumination that reaches every pixel regardless of
    /// orientation (0.0 - 1.0)
    pub ambient: f64,
    /// Compass bearing of the light source in degrees, clockwise from north
    pub azimuth: f64,
    /// Elevation of the light source above the horizon in degrees
    pub elevation: f64,
}

impl Default for HillshadeOptions {
    fn default() -> Self {
        Self {
            ambient: 0.25,
            azimuth: 315.0,
            elevation: 45.0,
        }
    }
}

/// How a composite is to be rendered.
///
/// A composite keeps its options for its whole life; changing options means
/// building a successor composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Draw TIN edges in the wireframe
    pub draw_edges: bool,
    /// Draw a marker at each visible vertex
    pub draw_vertices: bool,
    /// Label vertex markers
    pub draw_labels: bool,
    /// Attribute used for vertex labels
    pub label_field: LabelField,
    /// Color wireframe edges and markers by value
    pub palette_for_wireframe: bool,
    /// Palette name, see [`GradientPalette::SUPPORTED`]
    pub palette: String,
    /// Wireframe ink (RGBA)
    pub foreground: [u8; 4],
    /// Legend background (RGBA)
    pub background: [u8; 4],
    /// Color the raster by value; when false hillshade renders in gray
    pub raster: bool,
    /// Render the raster as shaded relief
    pub hillshade: bool,
    /// Lighting used when `hillshade` is set
    pub shading: HillshadeOptions,
    /// Value range mapped onto the palette; model z range when absent
    pub value_range: Option<[f64; 2]>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            draw_edges: true,
            draw_vertices: false,
            draw_labels: false,
            label_field: LabelField::Id,
            palette_for_wireframe: false,
            palette: "rainbow".into(),
            foreground: [0, 0, 0, 255],
            background: [255, 255, 255, 255],
            raster: true,
            hillshade: false,
            shading: HillshadeOptions::default(),
            value_range: None,
        }
    }
}

impl RenderOptions {
    /// Parse and validate options from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if GradientPalette::by_name(&self.palette).is_none() {
            return Err(Error::UnknownPalette(self.palette.clone()));
        }
        let ambient = self.shading.ambient;
        if !(0.0..=1.0).contains(&ambient) {
            return Err(Error::InvalidOption(format!(
                "hillshade ambient {} outside [0, 1]",
                ambient
            )));
        }
        if !self.shading.azimuth.is_finite() || !self.shading.elevation.is_finite() {
            return Err(Error::InvalidOption("non-finite light direction".into()));
        }
        if let Some([lo, hi]) = self.value_range {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(Error::InvalidOption("non-finite value range".into()));
            }
        }
        Ok(())
    }

    /// Whether a wireframe render would draw anything at all.
    pub fn is_wireframe_selected(&self) -> bool {
        self.draw_edges || self.draw_vertices
    }

    /// The selected palette, or an error for an unknown name.
    pub fn palette(&self) -> Result<GradientPalette> {
        GradientPalette::by_name(&self.palette).ok_or_else(|| Error::UnknownPalette(self.palette.clone()))
    }

    /// The palette range: the override when set, else `(min, max)`.
    pub fn value_range_or(&self, min: f64, max: f64) -> (f64, f64) {
        match self.value_range {
            Some([lo, hi]) => (lo, hi),
            None => (min, max),
        }
    }
}
