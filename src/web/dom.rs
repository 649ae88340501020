//! Small DOM helpers shared by the views

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::geom::Bounds;

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// New `<div>` with an inline style
pub fn create_div(document: &Document, css: &str) -> Result<HtmlElement, JsValue> {
    let el = document.create_element("div")?.dyn_into::<HtmlElement>()?;
    el.set_attribute("style", css)?;
    Ok(el)
}

/// Hidden host for a filter's `<svg>` definition
pub fn mount_filter_defs(document: &Document, parent: &Element, svg: &str) -> Result<HtmlElement, JsValue> {
    let host = create_div(document, "position: absolute; width: 0; height: 0; overflow: hidden;")?;
    host.set_attribute("aria-hidden", "true")?;
    host.set_inner_html(svg);
    parent.append_child(&host)?;
    Ok(host)
}

/// Viewport rectangle of an element
pub fn client_bounds(el: &Element) -> Bounds {
    let rect = el.get_bounding_client_rect();
    Bounds::new(rect.x() as f32, rect.y() as f32, rect.width() as f32, rect.height() as f32)
}

/// Client coordinates relative to an element's top-left corner
pub fn local_point(el: &Element, client_x: i32, client_y: i32) -> Vec2 {
    let origin = client_bounds(el).min();
    Vec2::new(client_x as f32, client_y as f32) - origin
}

pub fn viewport_width() -> f32 {
    web_sys::window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(1280.0) as f32
}

pub fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

/// Every element matching `selector`, as `HtmlElement`s
pub fn query_all(document: &Document, selector: &str) -> Vec<HtmlElement> {
    let Ok(list) = document.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect()
}

pub fn set_style(el: &HtmlElement, property: &str, value: &str) {
    let _ = el.style().set_property(property, value);
}
