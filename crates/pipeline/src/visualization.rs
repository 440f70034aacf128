//! Interactive map session state.
//!
//! A [`VisualizationContext`] owns one session's layer registry, its control
//! panel and the map view. Layers are addressed by the [`LayerId`] returned
//! at registration; display names are free to repeat. Every panel checkbox
//! registers its layer up front, hidden unless checked, and remembers the
//! handle so switching it off hides exactly that layer.

use std::sync::Arc;

use terramex_colormap::{raster_to_rgba, VisParams};
use terramex_core::{Raster, Region};
use tracing::{debug, warn};

/// Zoom level the session opens at
pub const DEFAULT_ZOOM: u8 = 5;

/// Stable handle of a registered layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    /// (lon, lat)
    pub center: (f64, f64),
    pub zoom: u8,
}

impl MapView {
    pub fn centered_on(region: &Region) -> Self {
        Self {
            center: region.center(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// A raster drawn on the map.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub id: LayerId,
    pub name: String,
    pub raster: Arc<Raster<f64>>,
    pub vis: VisParams,
    /// Registered but not drawn when false
    pub shown: bool,
}

/// A panel checkbox bound to one band and its styling.
#[derive(Debug, Clone)]
pub struct Checkbox {
    pub label: String,
    pub checked: bool,
    raster: Arc<Raster<f64>>,
    vis: VisParams,
    layer: Option<LayerId>,
}

impl Checkbox {
    /// Layer currently registered by this checkbox
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }
}

pub struct VisualizationContext {
    title: String,
    view: MapView,
    /// Insertion order is drawing order, bottom first
    layers: Vec<MapLayer>,
    checkboxes: Vec<Checkbox>,
    next_id: u64,
}

impl VisualizationContext {
    pub fn new(title: impl Into<String>, view: MapView) -> Self {
        Self {
            title: title.into(),
            view,
            layers: Vec::new(),
            checkboxes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn checkboxes(&self) -> &[Checkbox] {
        &self.checkboxes
    }

    /// Register a layer on top of the stack.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        raster: Arc<Raster<f64>>,
        vis: VisParams,
        shown: bool,
    ) -> LayerId {
        let name = name.into();
        if self.layers.iter().any(|l| l.name == name) {
            warn!("Layer name {name:?} is already registered");
        }
        let id = LayerId(self.next_id);
        self.next_id += 1;
        debug!("Adding layer {name:?} as {id:?}");
        self.layers.push(MapLayer {
            id,
            name,
            raster,
            vis,
            shown,
        });
        id
    }

    /// Remove one layer. Returns whether it was present.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        self.layers.len() != before
    }

    /// Handles of every layer called `name`, bottom first
    pub fn layers_named(&self, name: &str) -> Vec<LayerId> {
        self.layers.iter().filter(|l| l.name == name).map(|l| l.id).collect()
    }

    /// Add a panel checkbox and register its layer, shown only if `checked`.
    pub fn add_checkbox(
        &mut self,
        label: impl Into<String>,
        raster: Arc<Raster<f64>>,
        vis: VisParams,
        checked: bool,
    ) -> LayerId {
        let label = label.into();
        let id = self.add_layer(label.clone(), Arc::clone(&raster), vis.clone(), checked);
        self.checkboxes.push(Checkbox {
            label,
            checked,
            raster,
            vis,
            layer: Some(id),
        });
        id
    }

    /// Flip the first checkbox labelled `label`.
    ///
    /// Checking moves the checkbox's layer to the top and shows it;
    /// unchecking hides it. A layer removed behind the checkbox's back is
    /// registered again. Returns the new state, or `None` if no such
    /// checkbox exists.
    pub fn toggle(&mut self, label: &str) -> Option<bool> {
        let idx = self.checkboxes.iter().position(|c| c.label == label)?;
        let checked = !self.checkboxes[idx].checked;
        self.checkboxes[idx].checked = checked;

        let registered = self.checkboxes[idx]
            .layer
            .and_then(|id| self.layers.iter().position(|l| l.id == id));
        match registered {
            Some(pos) if checked => {
                let mut layer = self.layers.remove(pos);
                layer.shown = true;
                self.layers.push(layer);
            }
            Some(pos) => self.layers[pos].shown = false,
            None => {
                let (raster, vis) = {
                    let cb = &self.checkboxes[idx];
                    (Arc::clone(&cb.raster), cb.vis.clone())
                };
                let id = self.add_layer(label, raster, vis, checked);
                self.checkboxes[idx].layer = Some(id);
            }
        }
        Some(checked)
    }

    /// Layers actually drawn, bottom first
    pub fn visible_layers(&self) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter().filter(|l| l.shown)
    }

    /// RGBA pixels of a layer, row-major
    pub fn render(&self, id: LayerId) -> Option<Vec<u8>> {
        self.layer(id).map(|l| raster_to_rgba(&l.raster, &l.vis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;

    fn raster() -> Arc<Raster<f64>> {
        let mut r = Raster::from_vec(vec![0.0, 50.0, 100.0, f64::NAN], 2, 2).unwrap();
        r.set_nodata(Some(f64::NAN));
        Arc::new(r)
    }

    fn context() -> VisualizationContext {
        let mut ctx = VisualizationContext::new("Variables", MapView::centered_on(&Region::mexico()));
        ctx.add_checkbox("Elevación", raster(), VisParams::new(0.0, 100.0), true);
        ctx.add_checkbox("Pendiente", raster(), VisParams::new(0.0, 60.0), false);
        ctx
    }

    fn visible(ctx: &VisualizationContext) -> Vec<&str> {
        ctx.visible_layers().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn only_primary_starts_visible() {
        let ctx = context();
        assert_eq!(ctx.view().zoom, 5);
        assert_eq!(ctx.layers().len(), 2);
        assert_eq!(visible(&ctx), ["Elevación"]);
        assert!(ctx.checkboxes()[0].checked);
        assert!(!ctx.checkboxes()[1].checked);

        let hidden = ctx.checkboxes()[1].layer().unwrap();
        assert!(!ctx.layer(hidden).unwrap().shown);
    }

    #[test]
    fn toggle_shows_on_top_and_hides() {
        let mut ctx = context();
        assert_eq!(ctx.toggle("Pendiente"), Some(true));
        assert_eq!(visible(&ctx), ["Elevación", "Pendiente"]);

        let elevation = ctx.checkboxes()[0].layer().unwrap();
        assert_eq!(ctx.toggle("Elevación"), Some(false));
        assert_eq!(visible(&ctx), ["Pendiente"]);
        assert_eq!(ctx.layers().len(), 2);

        // Re-checking keeps the handle and draws it last
        assert_eq!(ctx.toggle("Elevación"), Some(true));
        assert_eq!(visible(&ctx), ["Pendiente", "Elevación"]);
        assert_eq!(ctx.checkboxes()[0].layer(), Some(elevation));
        assert_eq!(ctx.toggle("missing"), None);
    }

    #[test]
    fn toggling_off_hides_only_its_own_layer() {
        let mut ctx = context();
        // Same display name registered independently
        let other = ctx.add_layer("Elevación", raster(), VisParams::new(0.0, 1.0), true);
        assert_eq!(ctx.layers_named("Elevación").len(), 2);
        assert_eq!(ctx.visible_layers().count(), 2);

        ctx.toggle("Elevación");
        let shown: Vec<_> = ctx.visible_layers().map(|l| l.id).collect();
        assert_eq!(shown, [other]);
    }

    #[test]
    fn duplicate_layer_names_are_reported() {
        let mut ctx = context();
        let (_, logged) = test_log::warnings(|| ctx.add_layer("Pendiente", raster(), VisParams::new(0.0, 1.0), true));
        assert!(logged.contains("already registered"));
        assert!(logged.contains("Pendiente"));

        let (_, logged) = test_log::warnings(|| ctx.add_layer("Aspecto", raster(), VisParams::new(0.0, 360.0), true));
        assert!(logged.is_empty());
    }

    #[test]
    fn toggle_reregisters_a_removed_layer() {
        let mut ctx = context();
        let id = ctx.checkboxes()[1].layer().unwrap();
        assert!(ctx.remove_layer(id));

        assert_eq!(ctx.toggle("Pendiente"), Some(true));
        let fresh = ctx.checkboxes()[1].layer().unwrap();
        assert_ne!(fresh, id);
        assert_eq!(visible(&ctx), ["Elevación", "Pendiente"]);
    }

    #[test]
    fn removed_handle_is_gone() {
        let mut ctx = context();
        let id = ctx.checkboxes()[0].layer().unwrap();
        assert!(ctx.remove_layer(id));
        assert!(!ctx.remove_layer(id));
        assert!(ctx.render(id).is_none());
    }

    #[test]
    fn render_uses_layer_styling() {
        let ctx = context();
        let id = ctx.layers()[0].id;
        let rgba = ctx.render(id).unwrap();
        assert_eq!(rgba.len(), 16);
        // grayscale ramp, missing cell transparent
        assert_eq!(&rgba[0..4], [0, 0, 0, 255]);
        assert_eq!(&rgba[8..12], [255, 255, 255, 255]);
        assert_eq!(rgba[15], 0);
    }
}
