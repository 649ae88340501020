//! Composite layer
//!
//! A pure function of the published shape map: one fixed-position primitive
//! per entry, with a single filter applied on the layer container. Applying
//! the filter once at layer level is what makes neighbouring shapes fuse.

use crate::consts::CONTAINER_EXTRA_BLUR;
use crate::filter::GooFilter;
use crate::platform::Capabilities;
use crate::registry::{ShapeEntry, ShapeId, ShapeKind, ShapeMap};

/// Body of one painted shape
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeBody {
    /// Filled box (background comes from the style)
    Fill,
    /// Vector markup inside a relative, full-size wrapper
    Custom(String),
}

/// One element the layer mounts
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedShape {
    pub id: ShapeId,
    pub body: ShapeBody,
    /// Ordered CSS declarations
    pub style: Vec<(String, String)>,
}

impl RenderedShape {
    pub fn css(&self) -> String {
        self.style
            .iter()
            .map(|(prop, value)| format!("{prop}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .rev()
            .find(|(prop, _)| prop == property)
            .map(|(_, value)| value.as_str())
    }
}

/// Everything needed to paint the layer for one published map
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFrame {
    /// `filter` value for the layer container, `None` when unsupported
    pub filter: Option<String>,
    pub shapes: Vec<RenderedShape>,
}

/// Wrapper style for custom content
pub const CUSTOM_WRAPPER_CSS: &str =
    "position: relative; width: 100%; height: 100%; overflow: visible;";

/// Static style of the layer container itself
pub const LAYER_CSS: &str = "position: fixed; inset: 0; pointer-events: none; z-index: 0;";

/// The shared goo layer
#[derive(Debug, Clone)]
pub struct CompositeLayer {
    pub filter: GooFilter,
    pub capabilities: Capabilities,
    /// Blur applied after the filter url on the layer container
    pub layer_blur: f32,
}

impl CompositeLayer {
    pub fn new(filter: GooFilter, capabilities: Capabilities) -> Self {
        Self {
            filter,
            capabilities,
            layer_blur: CONTAINER_EXTRA_BLUR,
        }
    }

    /// Layer-level filter; omitted entirely without DOM filter support
    pub fn container_filter(&self) -> Option<String> {
        if !self.capabilities.dom_filters {
            return None;
        }
        if self.layer_blur > 0.0 {
            Some(format!("{} blur({}px)", self.filter.css_url(), self.layer_blur))
        } else {
            Some(self.filter.css_url())
        }
    }

    /// Derive the renderable shapes from the full map
    pub fn render(&self, shapes: &ShapeMap) -> LayerFrame {
        LayerFrame {
            filter: self.container_filter(),
            shapes: shapes
                .iter()
                .map(|(id, entry)| render_shape(*id, entry))
                .collect(),
        }
    }
}

/// Style and body for one entry
pub fn render_shape(id: ShapeId, entry: &ShapeEntry) -> RenderedShape {
    let b = &entry.bounds;
    let mut style: Vec<(String, String)> = vec![
        ("position".into(), "fixed".into()),
        ("transform".into(), b.css_transform(entry.scale)),
    ];
    // Entries may pin their own origin through extra style
    if !entry.style.extra.iter().any(|(prop, _)| prop == "transform-origin") {
        style.push(("transform-origin".into(), "center center".into()));
    }
    style.push(("width".into(), format!("{}px", b.width)));
    style.push(("height".into(), format!("{}px", b.height)));
    style.push(("will-change".into(), "transform".into()));
    if let Some(z) = entry.z_index {
        style.push(("z-index".into(), z.to_string()));
    }

    let body = match (&entry.kind, &entry.custom_content) {
        (ShapeKind::Custom, Some(markup)) => ShapeBody::Custom(markup.clone()),
        _ => {
            if let Some(radius) = entry.effective_corner_radius() {
                style.push(("border-radius".into(), radius.to_string()));
            }
            if let Some(color) = &entry.style.background_color {
                style.push(("background-color".into(), color.clone()));
            }
            if let Some(image) = &entry.style.background_image {
                style.push(("background-image".into(), image.clone()));
            }
            ShapeBody::Fill
        }
    };

    style.extend(entry.style.extra.iter().cloned());

    RenderedShape { id, body, style }
}
