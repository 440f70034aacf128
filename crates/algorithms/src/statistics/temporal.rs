//! Per-pixel reduction of an image time series to a single raster.

use std::borrow::Borrow;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use terramex_core::{Error, Raster, Result};

use crate::maybe_rayon::*;

/// Temporal reducer applied independently to every pixel.
///
/// Missing values in a slice are ignored; a pixel with no valid value in
/// any slice stays missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    Mean,
    Max,
    Min,
    Sum,
    /// Population standard deviation
    StdDev,
}

impl Reducer {
    /// Suffix appended to a band name after reduction, e.g. `ssm_stdDev`
    pub fn suffix(self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Max => "max",
            Reducer::Min => "min",
            Reducer::Sum => "sum",
            Reducer::StdDev => "stdDev",
        }
    }

    /// `<band>_<suffix>`
    pub fn band_name(self, band: &str) -> String {
        format!("{band}_{}", self.suffix())
    }
}

/// Running moments for one pixel (Welford)
#[derive(Debug, Clone, Copy)]
struct Moments {
    count: u32,
    mean: f64,
    m2: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Moments {
    const EMPTY: Self = Self {
        count: 0,
        mean: 0.0,
        m2: 0.0,
        sum: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    fn push(&mut self, v: f64) {
        self.count += 1;
        let delta = v - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (v - self.mean);
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn finish(&self, reducer: Reducer) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        match reducer {
            Reducer::Mean => self.mean,
            Reducer::Max => self.max,
            Reducer::Min => self.min,
            Reducer::Sum => self.sum,
            Reducer::StdDev => (self.m2 / self.count as f64).sqrt(),
        }
    }
}

/// Reduce co-registered slices into one raster.
///
/// The output inherits georeferencing from the first slice. Slices must all
/// share its shape. Accepts owned rasters or references.
pub fn reduce_collection<R>(slices: &[R], reducer: Reducer) -> Result<Raster<f64>>
where
    R: Borrow<Raster<f64>>,
{
    let slices: Vec<&Raster<f64>> = slices.iter().map(Borrow::borrow).collect();
    let first = *slices.first().ok_or(Error::EmptyCollection)?;
    let (rows, cols) = first.shape();
    if let Some(bad) = slices.iter().find(|s| s.shape() != (rows, cols)) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: bad.rows(),
            ac: bad.cols(),
        });
    }

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut acc = vec![Moments::EMPTY; cols];
            for slice in &slices {
                let data = slice.data();
                for (col, m) in acc.iter_mut().enumerate() {
                    let v = data[[row, col]];
                    if !slice.is_nodata(v) {
                        m.push(v);
                    }
                }
            }
            acc.iter().map(|m| m.finish(reducer)).collect::<Vec<_>>()
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: &[[f64; 2]]) -> Vec<Raster<f64>> {
        values
            .iter()
            .map(|v| Raster::from_vec(v.to_vec(), 1, 2).unwrap())
            .collect()
    }

    #[test]
    fn reducers_per_pixel() {
        let s = series(&[[2.0, 1.0], [4.0, 1.0], [6.0, 1.0], [8.0, 1.0]]);
        let get = |r| reduce_collection(&s, r).unwrap().get(0, 0).unwrap();
        assert_relative_eq!(get(Reducer::Mean), 5.0);
        assert_relative_eq!(get(Reducer::Max), 8.0);
        assert_relative_eq!(get(Reducer::Min), 2.0);
        assert_relative_eq!(get(Reducer::Sum), 20.0);
        assert_relative_eq!(get(Reducer::StdDev), 5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn missing_values_are_skipped() {
        let s = series(&[[f64::NAN, f64::NAN], [3.0, f64::NAN], [5.0, f64::NAN]]);
        let out = reduce_collection(&s, Reducer::Mean).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 4.0);
        assert!(out.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn empty_and_mismatched_inputs_fail() {
        let empty: [Raster<f64>; 0] = [];
        assert!(matches!(reduce_collection(&empty, Reducer::Sum), Err(Error::EmptyCollection)));

        let s = vec![Raster::<f64>::filled(2, 2, 1.0), Raster::filled(2, 3, 1.0)];
        assert!(matches!(
            reduce_collection(&s, Reducer::Max),
            Err(Error::SizeMismatch { ar: 2, ac: 3, .. })
        ));
    }

    #[test]
    fn band_names() {
        assert_eq!(Reducer::StdDev.band_name("ssm"), "ssm_stdDev");
        assert_eq!(Reducer::Mean.band_name("NDVI"), "NDVI_mean");
    }
}
