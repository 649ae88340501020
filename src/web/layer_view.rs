//! DOM side of the composite layer
//!
//! Reconciles one absolutely positioned `<div>` per published shape and
//! owns the layer filter's `<svg>` definition.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement};

use super::dom;
use crate::filter::GooFilter;
use crate::geom::Bounds;
use crate::layer::{CUSTOM_WRAPPER_CSS, CompositeLayer, LAYER_CSS, ShapeBody};
use crate::registry::{ShapeId, ShapeMap, ShapeNode};

pub struct LayerView {
    root: HtmlElement,
    defs: HtmlElement,
    layer: RefCell<CompositeLayer>,
    elements: RefCell<IndexMap<ShapeId, HtmlElement>>,
}

impl LayerView {
    /// Insert the layer and its filter at the start of `<body>`
    pub fn mount(document: &Document, layer: CompositeLayer) -> Result<Rc<Self>, JsValue> {
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        let root = dom::create_div(document, LAYER_CSS)?;
        root.set_attribute("data-goo-layer", "")?;
        root.set_attribute("aria-hidden", "true")?;
        body.prepend_with_node_1(&root)?;
        let defs = dom::mount_filter_defs(document, &body, &layer.filter.to_svg())?;

        let view = Rc::new(Self {
            root,
            defs,
            layer: RefCell::new(layer),
            elements: RefCell::new(IndexMap::new()),
        });
        view.apply_container_filter();
        Ok(view)
    }

    /// Swap the filter (viewport crossed the mobile breakpoint)
    pub fn set_filter(&self, filter: GooFilter) {
        if self.layer.borrow().filter == filter {
            return;
        }
        self.defs.set_inner_html(&filter.to_svg());
        self.layer.borrow_mut().filter = filter;
        self.apply_container_filter();
    }

    fn apply_container_filter(&self) {
        match self.layer.borrow().container_filter() {
            Some(filter) => dom::set_style(&self.root, "filter", &filter),
            None => {
                let _ = self.root.style().remove_property("filter");
            }
        }
    }

    /// Paint a freshly published map
    pub fn render(&self, shapes: &ShapeMap) {
        let frame = self.layer.borrow().render(shapes);
        let Ok(document) = dom::document() else {
            return;
        };
        let mut elements = self.elements.borrow_mut();

        elements.retain(|id, el| {
            let live = shapes.contains_key(id);
            if !live {
                el.remove();
            }
            live
        });

        for shape in &frame.shapes {
            let el = match elements.get(&shape.id) {
                Some(el) => el.clone(),
                None => {
                    let Ok(el) = dom::create_div(&document, "") else {
                        log::warn!("could not create element for {}", shape.id);
                        continue;
                    };
                    let _ = el.set_attribute("data-goo-shape", &shape.id.to_string());
                    let _ = self.root.append_child(&el);
                    elements.insert(shape.id, el.clone());
                    el
                }
            };
            let _ = el.set_attribute("style", &shape.css());
            match &shape.body {
                ShapeBody::Fill => {
                    if el.child_element_count() > 0 {
                        el.set_inner_html("");
                    }
                }
                ShapeBody::Custom(markup) => {
                    let html = format!("<div style=\"{CUSTOM_WRAPPER_CSS}\">{markup}</div>");
                    if el.inner_html() != html {
                        el.set_inner_html(&html);
                    }
                }
            }
        }
    }

    /// Registry-side handle for the direct transform path
    pub fn node(self: &Rc<Self>, id: ShapeId) -> Rc<dyn ShapeNode> {
        Rc::new(LayerNode {
            view: Rc::downgrade(self),
            id,
        })
    }

    pub fn unmount(&self) {
        self.elements.borrow_mut().clear();
        self.root.remove();
        self.defs.remove();
    }
}

struct LayerNode {
    view: Weak<LayerView>,
    id: ShapeId,
}

impl ShapeNode for LayerNode {
    fn apply_transform(&self, bounds: &Bounds, scale: Option<f32>) {
        let Some(view) = self.view.upgrade() else {
            return;
        };
        let Ok(elements) = view.elements.try_borrow() else {
            return;
        };
        if let Some(el) = elements.get(&self.id) {
            dom::set_style(el, "transform", &bounds.css_transform(scale));
            dom::set_style(el, "width", &format!("{}px", bounds.width));
            dom::set_style(el, "height", &format!("{}px", bounds.height));
        }
    }
}
