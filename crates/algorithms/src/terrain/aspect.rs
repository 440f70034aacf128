//! Aspect: compass bearing of steepest descent

use terramex_core::{Raster, Result};

use super::{map_windows, Spacing};

/// Parameters for aspect calculation
#[derive(Debug, Clone)]
pub struct AspectParams {
    /// Value written for cells with no gradient
    pub flat_value: f64,
}

impl Default for AspectParams {
    fn default() -> Self {
        Self { flat_value: 0.0 }
    }
}

/// Direction the slope faces in degrees clockwise from north, in `[0, 360)`.
///
/// Unequal east-west and north-south spacing on degree grids rotates the
/// bearing, so the gradient uses the same per-row spacing as [`slope`](super::slope).
pub fn aspect(dem: &Raster<f64>, params: AspectParams) -> Result<Raster<f64>> {
    let flat = params.flat_value;
    let spacing = Spacing::new(dem, None);
    map_windows(dem, |w, row| {
        let (dz_dx, dz_dy) = w.horn_gradient(spacing.at_row(row));
        if dz_dx == 0.0 && dz_dy == 0.0 {
            return flat;
        }
        // Descent points along (-dz_dx) east and (+dz_dy) north.
        let bearing = (-dz_dx).atan2(dz_dy).to_degrees();
        if bearing < 0.0 {
            bearing + 360.0
        } else {
            bearing
        }
    })
}
