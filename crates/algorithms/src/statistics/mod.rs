//! Statistical operators over rasters and raster collections
//!
//! - **focal**: moving-window statistics
//! - **gap_fill**: replace missing cells with their focal mean
//! - **temporal**: per-pixel reduction of a time series of slices

pub mod focal;
pub mod gap_fill;
pub mod temporal;

pub use focal::{focal_statistics, FocalParams, FocalStatistic};
pub use gap_fill::{fill_gaps, GapFillParams};
pub use temporal::{reduce_collection, Reducer};
