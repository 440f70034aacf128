//! Ordered multi-band composite

use crate::error::{Error, Result};
use crate::raster::Raster;

/// An ordered stack of named float bands.
///
/// Band names are unique and caller-controlled; insertion order is preserved
/// and drives export column order. Bands may sit on different grids: consumers
/// resolve each band at a map coordinate rather than by cell index.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: Vec<(String, Raster<f64>)>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from `(name, raster)` pairs, failing on repeated names.
    pub fn compose<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Raster<f64>)>,
        S: Into<String>,
    {
        let mut stack = Self::new();
        for (name, raster) in pairs {
            stack.push(name, raster)?;
        }
        Ok(stack)
    }

    /// Append a band at the end of the stack
    pub fn push(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateBand(name));
        }
        self.bands.push((name, raster));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.iter().any(|(n, _)| n == name)
    }

    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Band names in stack order
    pub fn names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// New stack holding only `names`, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut out = Self::new();
        for name in names {
            let name = name.as_ref();
            let raster = self
                .band(name)
                .ok_or_else(|| Error::BandNotFound(name.to_string()))?;
            out.push(name, raster.clone())?;
        }
        Ok(out)
    }

    /// Rename a band in place
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> Result<()> {
        let to = to.into();
        if from != to && self.contains(&to) {
            return Err(Error::DuplicateBand(to));
        }
        let slot = self
            .bands
            .iter_mut()
            .find(|(n, _)| n == from)
            .ok_or_else(|| Error::BandNotFound(from.to_string()))?;
        slot.0 = to;
        Ok(())
    }

    /// Values of every band at `(x, y)`, `None` where a band is missing.
    pub fn values_at_geo(&self, x: f64, y: f64) -> Vec<Option<f64>> {
        self.bands.iter().map(|(_, r)| r.value_at_geo(x, y)).collect()
    }

    /// Apply `f` to every band, keeping names and order.
    pub fn map_bands<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Raster<f64>) -> Result<Raster<f64>>,
    {
        let bands = self
            .bands
            .iter()
            .map(|(n, r)| f(r).map(|out| (n.clone(), out)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bands })
    }
}

impl IntoIterator for BandStack {
    type Item = (String, Raster<f64>);
    type IntoIter = std::vec::IntoIter<(String, Raster<f64>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.into_iter()
    }
}
