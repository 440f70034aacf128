//! Flow accumulation over a D8 direction grid
//!
//! Counts the cells draining through each cell. Headwater cells hold 0.

use ndarray::Array2;
use terramex_core::raster::d8;
use terramex_core::{Raster, Result};

/// Upstream cell counts from D8 codes.
///
/// Cells are visited in topological order (Kahn): a cell passes its total
/// downstream once every contributor has been resolved. Cells holding the
/// direction grid's nodata code come out as NaN and contribute nothing.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();
    let codes = flow_dir.data();
    let valid = |r: usize, c: usize| !flow_dir.is_nodata(codes[[r, c]]);
    let target = |r: usize, c: usize| {
        d8::downstream(codes[[r, c]], r, c, rows, cols).filter(|&(nr, nc)| valid(nr, nc))
    };

    let mut inflow = Array2::<u32>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if !valid(row, col) {
                continue;
            }
            if let Some(next) = target(row, col) {
                inflow[next] += 1;
            }
        }
    }

    let mut accumulation = Array2::<f64>::zeros((rows, cols));
    let mut ready: Vec<(usize, usize)> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .filter(|&(r, c)| valid(r, c) && inflow[[r, c]] == 0)
        .collect();

    while let Some((row, col)) = ready.pop() {
        let Some(next) = target(row, col) else {
            continue;
        };
        accumulation[next] += accumulation[[row, col]] + 1.0;
        inflow[next] -= 1;
        if inflow[next] == 0 {
            ready.push(next);
        }
    }

    for ((row, col), value) in accumulation.indexed_iter_mut() {
        if !valid(row, col) {
            *value = f64::NAN;
        }
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = accumulation;
    Ok(output)
}
