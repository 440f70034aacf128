//! # terramex algorithms
//!
//! Raster kernels used by the point-grid pipelines.
//!
//! - **terrain**: slope, aspect, hillshade, roughness
//! - **hydrology**: D8 flow direction, flow accumulation
//! - **statistics**: focal statistics, gap filling, temporal reduction

mod maybe_rayon;

pub mod hydrology;
pub mod statistics;
pub mod terrain;
