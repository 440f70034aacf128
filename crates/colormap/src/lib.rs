//! # terramex colormap
//!
//! Color ramps for map layers. A [`Palette`] is an evenly spaced list of
//! colors written as hex codes or CSS names; [`VisParams`] pairs it with a
//! value range, and [`raster_to_rgba`] turns a raster into an RGBA buffer.
//!
//! ```ignore
//! use terramex_colormap::{raster_to_rgba, Palette, VisParams};
//!
//! let vis = VisParams::new(0.0, 4000.0)
//!     .with_palette(Palette::parse(&["#008435", "#1CAC78", "#EDE6D6", "#736F6E", "#FFFFFF"])?);
//! let rgba = raster_to_rgba(&dem, &vis);
//! ```

mod error;
mod palette;
mod render;

pub use error::{ColormapError, Result};
pub use palette::{Palette, Rgb};
pub use render::{raster_to_rgba, VisParams};
