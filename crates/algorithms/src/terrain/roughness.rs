//! Roughness: elevation range inside the 3x3 window

use terramex_core::{Raster, Result};

use super::map_windows;

/// Largest minus smallest elevation among the cell and its 8 neighbours.
pub fn roughness(dem: &Raster<f64>) -> Result<Raster<f64>> {
    map_windows(dem, |w, _| {
        let (lo, hi) = w
            .cells
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        hi - lo
    })
}
