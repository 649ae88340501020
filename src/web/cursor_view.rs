//! Pointer listeners feeding the cursor overlay
//!
//! Mouse pointers only; touch and pen never drive the overlay. Hover targets
//! are elements marked `data-goo-hover`.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, PointerEvent};

use super::dom;
use super::layer_view::LayerView;
use crate::cursor::{CursorOverlay, CursorRect, CursorStyle};
use crate::registry::{ShapeNode, ShapeRegistry};

const HOVER_SELECTOR: &str = "[data-goo-hover]";

struct CursorState {
    registry: Rc<RefCell<ShapeRegistry>>,
    overlay: RefCell<CursorOverlay>,
    node: Rc<dyn ShapeNode>,
}

impl CursorState {
    fn with_registry(&self, f: impl FnOnce(&mut CursorOverlay, &mut ShapeRegistry)) {
        let Ok(mut registry) = self.registry.try_borrow_mut() else {
            return;
        };
        let mut overlay = self.overlay.borrow_mut();
        let id = overlay.id();
        let fresh = !registry.contains(id);
        f(&mut overlay, &mut registry);
        if fresh && registry.contains(id) {
            registry.attach_node(id, Rc::clone(&self.node));
        }
    }
}

pub struct CursorBinding {
    state: Rc<CursorState>,
    _listeners: Vec<EventListener>,
}

impl CursorBinding {
    pub fn mount(
        registry: &Rc<RefCell<ShapeRegistry>>,
        view: &Rc<LayerView>,
        style: CursorStyle,
    ) -> Result<Self, JsValue> {
        let window = dom::window()?;
        let document = dom::document()?;
        let id = registry.borrow_mut().allocate_id();
        let state = Rc::new(CursorState {
            registry: Rc::clone(registry),
            overlay: RefCell::new(CursorOverlay::new(id, style)),
            node: view.node(id),
        });
        let capture = EventListenerOptions::run_in_capture_phase();
        let mut listeners = Vec::new();

        {
            let state = Rc::clone(&state);
            listeners.push(EventListener::new_with_options(&window, "pointermove", capture, move |event| {
                let Some(event) = mouse_pointer(event) else {
                    return;
                };
                let (x, y) = (event.client_x() as f32, event.client_y() as f32);
                state.with_registry(|overlay, registry| overlay.pointer_moved(registry, x, y));
            }));
        }
        {
            let state = Rc::clone(&state);
            listeners.push(EventListener::new_with_options(&document, "pointerover", capture, move |event| {
                if mouse_pointer(event).is_none() {
                    return;
                }
                let hovered = hover_target(event).map(|el| CursorRect::from_bounds(dom::client_bounds(&el)));
                state.with_registry(|overlay, registry| overlay.set_hovered(registry, hovered));
            }));
        }
        for (kind, pressed) in [("mousedown", true), ("mouseup", false)] {
            let state = Rc::clone(&state);
            listeners.push(EventListener::new(&window, kind, move |_| {
                state.with_registry(|overlay, registry| overlay.set_pressed(registry, pressed));
            }));
        }

        log::info!("cursor overlay mounted as {id}");
        Ok(Self {
            state,
            _listeners: listeners,
        })
    }

    /// Put the cursor back after the registry was cleared
    pub fn route_changed(&self) {
        self.state
            .with_registry(|overlay, registry| overlay.route_changed(registry));
    }
}

impl Drop for CursorBinding {
    fn drop(&mut self) {
        self.state
            .with_registry(|overlay, registry| overlay.unmount(registry));
    }
}

fn mouse_pointer(event: &Event) -> Option<&PointerEvent> {
    event
        .dyn_ref::<PointerEvent>()
        .filter(|e| e.pointer_type() == "mouse")
}

fn hover_target(event: &Event) -> Option<Element> {
    event
        .target()?
        .dyn_into::<Element>()
        .ok()?
        .closest(HOVER_SELECTOR)
        .ok()
        .flatten()
}
