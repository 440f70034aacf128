//! Planar rectangular analysis region

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Static rectangular extent in geographic coordinates.
///
/// Interpreted as a planar rectangle (edges are straight lines in lon/lat),
/// never as geodesic segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(default)]
    pub geodesic: bool,
}

impl Region {
    /// Build a planar region from `[xmin, ymin, xmax, ymax]`.
    pub fn from_coords(coords: [f64; 4]) -> Result<Self> {
        let [min_x, min_y, max_x, max_y] = coords;
        if !(min_x < max_x && min_y < max_y) {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("{:?}", coords),
                reason: "expected xmin < xmax and ymin < ymax".into(),
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
            geodesic: false,
        })
    }

    /// Bounding box covering Mexico shared by every pipeline.
    pub const fn mexico() -> Self {
        Self {
            min_x: -117.12776,
            min_y: 14.5388286,
            max_x: -86.811982,
            max_y: 32.72083,
            geodesic: false,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre point (x, y)
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Inclusive point-in-rectangle test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether `(min_x, min_y, max_x, max_y)` bounds overlap this region.
    pub fn intersects(&self, bounds: (f64, f64, f64, f64)) -> bool {
        let (bx0, by0, bx1, by1) = bounds;
        bx0 <= self.max_x && bx1 >= self.min_x && by0 <= self.max_y && by1 >= self.min_y
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::mexico()
    }
}
