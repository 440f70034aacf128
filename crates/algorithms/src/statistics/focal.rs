//! Focal (moving window) statistics

use ndarray::Array2;
use terramex_core::raster::square_offsets;
use terramex_core::{Error, Raster, Result};

use crate::maybe_rayon::*;

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStatistic {
    Mean,
    /// Population standard deviation
    StdDev,
    Min,
    Max,
    /// max - min
    Range,
    Sum,
    /// Number of valid cells in the window
    Count,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window radius in pixels; the window is `2 * radius + 1` wide
    pub radius: usize,
    pub statistic: FocalStatistic,
    /// Keep only offsets within `radius` of the centre
    pub circular: bool,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            radius: 1,
            statistic: FocalStatistic::Mean,
            circular: false,
        }
    }
}

/// Compute a statistic over the valid cells of the window around every cell.
///
/// Missing cells are skipped; a window with no valid cells yields NaN.
/// Windows are truncated at the grid edge.
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".into(),
            reason: "focal radius must be > 0".into(),
        });
    }

    let (rows, cols) = raster.shape();
    let r2 = (params.radius * params.radius) as isize;
    let offsets: Vec<(isize, isize)> = square_offsets(params.radius)
        .into_iter()
        .filter(|&(dr, dc)| !params.circular || dr * dr + dc * dc <= r2)
        .collect();
    let data = raster.data();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut values = Vec::with_capacity(offsets.len());
            (0..cols)
                .map(|col| {
                    values.clear();
                    for &(dr, dc) in &offsets {
                        let nr = row as isize + dr;
                        let nc = col as isize + dc;
                        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                            continue;
                        }
                        let v = data[[nr as usize, nc as usize]];
                        if !raster.is_nodata(v) {
                            values.push(v);
                        }
                    }
                    if values.is_empty() {
                        f64::NAN
                    } else {
                        compute_statistic(&values, params.statistic)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

fn compute_statistic(values: &[f64], stat: FocalStatistic) -> f64 {
    let n = values.len() as f64;
    let min = || values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = || values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    match stat {
        FocalStatistic::Mean => values.iter().sum::<f64>() / n,
        FocalStatistic::StdDev => {
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            var.sqrt()
        }
        FocalStatistic::Min => min(),
        FocalStatistic::Max => max(),
        FocalStatistic::Range => max() - min(),
        FocalStatistic::Sum => values.iter().sum(),
        FocalStatistic::Count => n,
    }
}
