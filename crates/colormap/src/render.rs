//! Raster-to-RGBA rendering.

use serde::{Deserialize, Serialize};
use terramex_core::{Raster, RasterElement};

use crate::palette::{Palette, Rgb};

/// Display range and color ramp for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Value mapped to the first palette color
    pub min: f64,
    /// Value mapped to the last palette color
    pub max: f64,
    /// `None` renders grayscale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
}

impl VisParams {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            palette: None,
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Color for a valid value
    pub fn color(&self, value: f64) -> Rgb {
        let range = self.max - self.min;
        let t = if range.abs() > f64::EPSILON {
            (value - self.min) / range
        } else {
            0.0
        };
        match &self.palette {
            Some(p) => p.evaluate(t),
            None => {
                let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
                Rgb::new(v, v, v)
            }
        }
    }
}

/// Convert a raster to a row-major RGBA buffer of `rows * cols * 4` bytes.
///
/// Nodata and non-finite cells are fully transparent.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, vis: &VisParams) -> Vec<u8> {
    let nodata = raster.nodata();
    let mut rgba = Vec::with_capacity(raster.len() * 4);

    for val in raster.data().iter() {
        let value = if val.is_nodata(nodata) { None } else { val.to_f64() };
        match value {
            Some(v) if v.is_finite() => {
                let Rgb { r, g, b } = vis.color(v);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
            _ => rgba.extend_from_slice(&[0, 0, 0, 0]),
        }
    }

    rgba
}
