//! Slope in degrees (Horn 1981)

use terramex_core::{Raster, Result};

use super::{map_windows, Spacing};

/// Parameters for slope calculation
#[derive(Debug, Clone, Default)]
pub struct SlopeParams {
    /// Multiplier applied to the cell size before differencing.
    ///
    /// `None` picks it from the DEM's CRS (see [`cell_spacing`](super::cell_spacing)).
    pub z_factor: Option<f64>,
}

/// Steepest descent angle, 0 (flat) to 90 degrees.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let spacing = Spacing::new(dem, params.z_factor);
    map_windows(dem, |w, row| {
        let (dz_dx, dz_dy) = w.horn_gradient(spacing.at_row(row));
        dz_dx.hypot(dz_dy).atan().to_degrees()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::test_dems::{on_grid, surface};
    use approx::assert_relative_eq;
    use terramex_core::{GeoTransform, CRS};

    #[test]
    fn flat_surface_has_zero_slope() {
        let dem = surface(|_, _| 100.0);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(5, 5).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn unit_ramp_is_45_degrees() {
        let dem = surface(|_, c| c as f64);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(4, 4).unwrap(), 45.0, epsilon = 1e-9);
        assert_relative_eq!(result.get(6, 2).unwrap(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn border_is_missing() {
        let dem = surface(|r, c| (r + c) as f64);
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert!(result.get(9, 4).unwrap().is_nan());
        assert!(result.get(4, 4).unwrap().is_finite());
    }

    #[test]
    fn z_factor_flattens_degree_grids() {
        let dem = surface(|_, c| c as f64);
        let params = SlopeParams {
            z_factor: Some(100.0),
        };
        let result = slope(&dem, params).unwrap();
        let expected = (1.0f64 / 100.0).atan().to_degrees();
        assert_relative_eq!(result.get(5, 5).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn geographic_slope_uses_latitude_corrected_spacing() {
        // 0.001 degree cells centred on 30N, rising 1 m per cell east and north
        let transform = GeoTransform::new(-100.0, 30.0055, 0.001, -0.001);
        let mut dem = on_grid(transform, |r, c| c as f64 + (9 - r) as f64);
        dem.set_crs(Some(CRS::wgs84()));

        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert_relative_eq!(result.get(5, 5).unwrap(), 0.7862, epsilon = 1e-3);
    }
}
