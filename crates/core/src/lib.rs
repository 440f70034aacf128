//! # terramex core
//!
//! Shared types for the terramex point-grid pipelines:
//! - `Raster<T>`: georeferenced 2D grid
//! - `BandStack`: ordered, uniquely named multi-band composite
//! - `Region`: planar bounding box every pipeline is clipped to
//! - `GeoTransform` / `CRS`: georeferencing metadata
//! - Native GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{BandStack, GeoTransform, Raster, RasterElement};
pub use region::Region;
