//! Analytical hillshade, 0 to 255

use terramex_core::{Error, Raster, Result};

use super::{map_windows, Spacing};

/// Illumination geometry
#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees clockwise from north
    pub azimuth: f64,
    /// Sun elevation above the horizon in degrees
    pub altitude: f64,
    /// See [`SlopeParams::z_factor`](super::SlopeParams)
    pub z_factor: Option<f64>,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 270.0,
            altitude: 45.0,
            z_factor: None,
        }
    }
}

/// Lambertian shading of the surface under a point light source.
pub fn hillshade(dem: &Raster<f64>, params: HillshadeParams) -> Result<Raster<f64>> {
    if !(0.0..=90.0).contains(&params.altitude) {
        return Err(Error::InvalidParameter {
            name: "altitude",
            value: params.altitude.to_string(),
            reason: "must be between 0 and 90 degrees".into(),
        });
    }

    let spacing = Spacing::new(dem, params.z_factor);
    let zenith = (90.0 - params.altitude).to_radians();
    let (sin_zenith, cos_zenith) = zenith.sin_cos();
    // Compass azimuth to a math angle (counter-clockwise from east)
    let sun = (450.0 - params.azimuth).rem_euclid(360.0).to_radians();

    map_windows(dem, |w, row| {
        let (dz_dx, dz_dy) = w.horn_gradient(spacing.at_row(row));
        let slope = dz_dx.hypot(dz_dy).atan();
        let facing = dz_dy.atan2(-dz_dx);
        let shade = cos_zenith * slope.cos() + sin_zenith * slope.sin() * (sun - facing).cos();
        (255.0 * shade).clamp(0.0, 255.0)
    })
}
