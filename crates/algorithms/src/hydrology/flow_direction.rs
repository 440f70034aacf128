//! D8 flow direction
//!
//! Each cell points at its steepest downslope neighbour:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! `0` marks a pit or flat cell. Cells with a missing elevation get
//! [`FLOW_NODATA`].

use ndarray::Array2;
use terramex_core::raster::d8;
use terramex_core::{Error, Raster, Result};

use crate::maybe_rayon::*;

/// Code written for cells without an elevation
pub const FLOW_NODATA: u8 = 255;

/// Calculate D8 flow direction codes from a DEM.
///
/// Ties keep the first neighbour in code order (E, NE, N, ... SE). The DEM is
/// not conditioned first, so depressions show up as pits.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let data = dem.data();

    let codes: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![FLOW_NODATA; cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let center = data[[row, col]];
                if dem.is_nodata(center) {
                    continue;
                }

                let mut steepest = 0.0_f64;
                let mut code = 0u8;
                for k in 0..8u8 {
                    let Some((nr, nc)) = d8::downstream(k + 1, row, col, rows, cols) else {
                        continue;
                    };
                    let neighbour = data[[nr, nc]];
                    if dem.is_nodata(neighbour) {
                        continue;
                    }
                    let drop = (center - neighbour) / d8::DISTANCES[k as usize];
                    if drop > steepest {
                        steepest = drop;
                        code = k + 1;
                    }
                }
                *slot = code;
            }
            out
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(FLOW_NODATA));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), codes).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
