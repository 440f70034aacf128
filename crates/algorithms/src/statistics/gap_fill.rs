//! Gap filling: missing cells take the mean of their valid neighbours.

use ndarray::Zip;
use terramex_core::{Raster, RasterElement, Result};

use super::focal::{focal_statistics, FocalParams, FocalStatistic};

/// Parameters for [`fill_gaps`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapFillParams {
    /// Square kernel radius in pixels
    pub radius: usize,
}

impl Default for GapFillParams {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

/// Replace missing cells with the focal mean around them.
///
/// Valid cells are returned unchanged. A gap wider than the kernel stays
/// missing where no valid neighbour is in reach.
pub fn fill_gaps(raster: &Raster<f64>, params: GapFillParams) -> Result<Raster<f64>> {
    let mean = focal_statistics(
        raster,
        FocalParams {
            radius: params.radius,
            statistic: FocalStatistic::Mean,
            circular: false,
        },
    )?;

    let mut out = raster.clone();
    out.set_nodata(Some(f64::NAN));
    let nodata = raster.nodata();
    Zip::from(out.data_mut()).and(mean.data()).for_each(|v, &m| {
        if v.is_nodata(nodata) {
            *v = m;
        }
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn valid_cells_are_untouched() {
        let r = Raster::from_vec((0..25).map(|v| v as f64).collect(), 5, 5).unwrap();
        let out = fill_gaps(&r, GapFillParams::default()).unwrap();
        assert_eq!(out.data(), r.data());
    }

    #[test]
    fn hole_takes_neighbour_mean() {
        let mut r = Raster::filled(5, 5, 4.0);
        r.set(2, 2, f64::NAN).unwrap();
        r.set(0, 0, 28.0).unwrap();
        let out = fill_gaps(&r, GapFillParams::default()).unwrap();
        // 24 valid cells: 23 * 4 + 28 = 120
        assert_relative_eq!(out.get(2, 2).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(out.get(0, 0).unwrap(), 28.0);
    }

    #[test]
    fn declared_nodata_is_filled() {
        let mut r = Raster::filled(3, 3, 1.0);
        r.set_nodata(Some(-9999.0));
        r.set(1, 1, -9999.0).unwrap();
        let out = fill_gaps(&r, GapFillParams::default()).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn wide_gap_stays_missing_beyond_radius() {
        let mut r = Raster::filled(1, 9, f64::NAN);
        r.set(0, 0, 1.0).unwrap();
        let out = fill_gaps(&r, GapFillParams { radius: 2 }).unwrap();
        assert_eq!(out.get(0, 2).unwrap(), 1.0);
        assert!(out.get(0, 3).unwrap().is_nan());
    }
}
