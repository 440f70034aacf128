//! Terrain derivatives computed from a 3x3 window over a DEM.
//!
//! All operators share the Horn (1981) gradient estimate and leave a
//! one-cell border of NaN where the window is incomplete.

mod aspect;
mod hillshade;
mod roughness;
mod slope;

pub use aspect::{aspect, AspectParams};
pub use hillshade::{hillshade, HillshadeParams};
pub use roughness::roughness;
pub use slope::{slope, SlopeParams};

use ndarray::Array2;
use terramex_core::{Error, Raster, Result};

use crate::maybe_rayon::*;

/// Approximate length of one degree at the equator, in metres
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Ground distance between neighbouring cell centres, in elevation units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSpacing {
    /// East-west spacing
    pub dx: f64,
    /// North-south spacing
    pub dy: f64,
}

/// Cell spacing of a DEM as a function of row.
///
/// Degree grids with metre elevations shrink east-west with the cosine of
/// the row's latitude. An explicit `z_factor` replaces the CRS-derived scale
/// on both axes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Spacing {
    dx: f64,
    dy: f64,
    origin_y: f64,
    pixel_height: f64,
    geographic: bool,
}

impl Spacing {
    pub fn new(dem: &Raster<f64>, z_factor: Option<f64>) -> Self {
        let t = dem.transform();
        let geographic = z_factor.is_none() && dem.crs().is_some_and(|crs| crs.is_geographic());
        let scale = z_factor.unwrap_or(if geographic { METERS_PER_DEGREE } else { 1.0 });
        Self {
            dx: t.pixel_width.abs() * scale,
            dy: t.pixel_height.abs() * scale,
            origin_y: t.origin_y,
            pixel_height: t.pixel_height,
            geographic,
        }
    }

    pub fn at_row(&self, row: usize) -> CellSpacing {
        if !self.geographic {
            return CellSpacing { dx: self.dx, dy: self.dy };
        }
        let lat = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        CellSpacing {
            dx: self.dx * lat.to_radians().cos(),
            dy: self.dy,
        }
    }
}

/// Spacing the terrain operators use at `row` of `dem` when no `z_factor`
/// is given.
pub fn cell_spacing(dem: &Raster<f64>, row: usize) -> CellSpacing {
    Spacing::new(dem, None).at_row(row)
}

/// Valid 3x3 neighbourhood around an interior cell.
///
/// Layout:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub cells: [f64; 9],
}

impl Window {
    /// `None` at the grid border or when any cell is missing
    pub fn gather(dem: &Raster<f64>, row: usize, col: usize) -> Option<Self> {
        let (rows, cols) = dem.shape();
        if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= cols {
            return None;
        }
        let data = dem.data();
        let mut cells = [0.0; 9];
        for (k, cell) in cells.iter_mut().enumerate() {
            let v = data[[row + k / 3 - 1, col + k % 3 - 1]];
            if dem.is_nodata(v) {
                return None;
            }
            *cell = v;
        }
        Some(Self { cells })
    }

    /// Horn gradient `(dz/dx, dz/dy)` with x eastward and y toward
    /// increasing row (southward).
    pub fn horn_gradient(&self, spacing: CellSpacing) -> (f64, f64) {
        let [a, b, c, d, _, f, g, h, i] = self.cells;
        let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * spacing.dx);
        let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * spacing.dy);
        (dz_dx, dz_dy)
    }
}

/// Apply `op` to every full window, in parallel over rows. `op` also gets
/// the window's row.
pub(crate) fn map_windows<F>(dem: &Raster<f64>, op: F) -> Result<Raster<f64>>
where
    F: Fn(&Window, usize) -> f64 + Sync,
{
    let (rows, cols) = dem.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| Window::gather(dem, row, col).map_or(f64::NAN, |w| op(&w, row)))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
