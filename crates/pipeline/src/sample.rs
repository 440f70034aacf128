//! Seeded point sampling of a band composite.
//!
//! The region is divided into square cells of `scale_m` metres (converted to
//! degrees at the equator) anchored at its south-west corner. A fixed number
//! of distinct cells is drawn uniformly, and every band is read at each cell
//! centre.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use terramex_algorithms::terrain::METERS_PER_DEGREE;
use terramex_core::{BandStack, Region, CRS};
use tracing::debug;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleParams {
    pub region: Region,
    /// Sampling resolution in metres
    pub scale_m: f64,
    /// Upper bound on returned points
    pub num_pixels: usize,
    pub seed: u64,
    /// Coordinate system of the returned points; must be geographic
    pub projection: CRS,
    /// Drop points where any band is missing
    pub drop_nulls: bool,
}

impl SampleParams {
    pub fn new(region: Region, scale_m: f64, num_pixels: usize) -> Self {
        Self {
            region,
            scale_m,
            num_pixels,
            seed: 0,
            projection: CRS::wgs84(),
            drop_nulls: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Grid cell edge in degrees
    pub fn cell_degrees(&self) -> f64 {
        self.scale_m / METERS_PER_DEGREE
    }
}

/// One sampled location with a value per band (`None` where missing).
#[derive(Debug, Clone, PartialEq)]
pub struct PointSample {
    pub lon: f64,
    pub lat: f64,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    /// Band names, parallel to each point's `values`
    pub bands: Vec<String>,
    pub points: Vec<PointSample>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sample `stack` at up to `params.num_pixels` random cell centres inside the region.
pub fn sample(stack: &BandStack, params: &SampleParams) -> Result<SampleSet> {
    if !params.projection.is_geographic() {
        return Err(PipelineError::InvalidConfig(format!(
            "sampling projection {} is not geographic",
            params.projection
        )));
    }
    if !(params.scale_m > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "sampling scale must be positive, got {}",
            params.scale_m
        )));
    }

    let region = params.region;
    let cell = params.cell_degrees();
    let cols = ((region.width() / cell).floor() as usize).max(1);
    let rows = ((region.height() / cell).floor() as usize).max(1);
    let total = cols.saturating_mul(rows);
    let amount = params.num_pixels.min(total);

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut picks = index::sample(&mut rng, total, amount).into_vec();
    picks.sort_unstable();
    debug!("Sampling {amount} of {total} cells ({rows}x{cols}, {cell:.6} deg)");

    let bands: Vec<String> = stack.names().into_iter().map(String::from).collect();
    let mut points = Vec::with_capacity(amount);
    for pick in picks {
        let (row, col) = (pick / cols, pick % cols);
        let lon = (region.min_x + (col as f64 + 0.5) * cell).min(region.max_x);
        let lat = (region.min_y + (row as f64 + 0.5) * cell).min(region.max_y);
        let values = stack.values_at_geo(lon, lat);
        if params.drop_nulls && values.iter().any(Option::is_none) {
            continue;
        }
        points.push(PointSample { lon, lat, values });
    }

    debug!("Kept {} of {amount} sampled points", points.len());
    Ok(SampleSet { bands, points })
}
