//! Goo containers: `[data-goo]` elements tracked by a bounds reporter
//!
//! The shape template comes from the `data-goo*` attributes (see
//! `ShapeEntry::from_attributes`) and follows later attribute changes.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use gloo::render::{AnimationFrame, request_animation_frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, MutationObserver, MutationObserverInit, ResizeObserver};

use super::dom;
use super::layer_view::LayerView;
use crate::geom::Bounds;
use crate::platform::Capabilities;
use crate::registry::{ShapeEntry, ShapeNode, ShapeRegistry};
use crate::reporter::{BoundsReporter, Measure, ReporterMode, is_scroll_container};

pub const CONTAINER_SELECTOR: &str = "[data-goo]";
const BOUND_ATTR: &str = "data-goo-bound";

/// A tracked element
pub struct ElementTarget(pub HtmlElement);

impl Measure for ElementTarget {
    fn measure(&self) -> Option<Bounds> {
        if !self.0.is_connected() {
            return None;
        }
        Some(dom::client_bounds(&self.0))
    }
}

/// Shape template from the element's data attributes
pub fn template_for(el: &Element) -> ShapeEntry {
    ShapeEntry::from_attributes(|name| el.get_attribute(name))
}

/// Attributes whose change re-registers the shape with a new template
const TEMPLATE_ATTRS: [&str; 10] = [
    "data-goo",
    "data-goo-color",
    "data-goo-colors",
    "data-goo-image",
    "data-goo-radius",
    "data-goo-bg-size",
    "data-goo-style",
    "data-goo-content",
    "data-goo-z",
    "data-goo-scale",
];

struct Tracker {
    registry: Rc<RefCell<ShapeRegistry>>,
    reporter: RefCell<BoundsReporter<ElementTarget>>,
    node: Rc<dyn ShapeNode>,
    poll_frame: RefCell<Option<AnimationFrame>>,
    scroll_frame: RefCell<Option<AnimationFrame>>,
}

impl Tracker {
    /// Run a reporter operation, attaching the render node when the id
    /// becomes freshly registered
    fn with_reporter(&self, f: impl FnOnce(&mut BoundsReporter<ElementTarget>, &mut ShapeRegistry)) {
        let Ok(mut registry) = self.registry.try_borrow_mut() else {
            return;
        };
        let mut reporter = self.reporter.borrow_mut();
        let id = reporter.id();
        let fresh = !registry.contains(id);
        f(&mut reporter, &mut registry);
        if fresh && registry.contains(id) {
            // Nodes are dropped when the registry is cleared
            registry.attach_node(id, Rc::clone(&self.node));
        }
    }

    fn poll(&self) {
        self.with_reporter(|reporter, registry| {
            reporter.poll(registry);
        });
    }

    fn schedule_poll(self: &Rc<Self>) {
        let tracker = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            tracker.poll_frame.borrow_mut().take();
            tracker.poll();
            tracker.schedule_poll();
        });
        *self.poll_frame.borrow_mut() = Some(handle);
    }

    /// Scroll events arrive far more often than frames; coalesce them
    fn schedule_scroll(self: &Rc<Self>) {
        if self.scroll_frame.borrow().is_some() {
            return;
        }
        let tracker = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            tracker.scroll_frame.borrow_mut().take();
            if let Ok(mut registry) = tracker.registry.try_borrow_mut() {
                tracker.reporter.borrow_mut().on_scroll(&mut registry);
            }
        });
        *self.scroll_frame.borrow_mut() = Some(handle);
    }

    fn restyled(&self, element: &Element) {
        let template = template_for(element);
        self.with_reporter(|reporter, registry| reporter.set_template(registry, template));
    }

    fn resized(&self) {
        if let Ok(mut registry) = self.registry.try_borrow_mut() {
            self.reporter.borrow_mut().on_resize(&mut registry);
        }
    }
}

/// Live binding for one container; dropping it stops tracking
pub struct ContainerBinding {
    element: HtmlElement,
    tracker: Rc<Tracker>,
    observer: Option<(ResizeObserver, Closure<dyn FnMut(js_sys::Array)>)>,
    attributes: Option<(MutationObserver, Closure<dyn FnMut(js_sys::Array)>)>,
    backdrop: Option<HtmlElement>,
    _listeners: Vec<EventListener>,
}

impl ContainerBinding {
    pub fn mount(
        registry: &Rc<RefCell<ShapeRegistry>>,
        view: &Rc<LayerView>,
        element: HtmlElement,
        caps: &Capabilities,
    ) -> Result<Self, JsValue> {
        let id = registry.borrow_mut().allocate_id();
        let target = Rc::new(ElementTarget(element.clone()));
        let reporter = BoundsReporter::new(id, target, template_for(&element), caps);
        element.set_attribute(BOUND_ATTR, &id.to_string())?;

        let tracker = Rc::new(Tracker {
            registry: Rc::clone(registry),
            reporter: RefCell::new(reporter),
            node: view.node(id),
            poll_frame: RefCell::new(None),
            scroll_frame: RefCell::new(None),
        });

        if tracker.reporter.borrow().mode() == ReporterMode::LocalBlur {
            let backdrop = mount_local_backdrop(&element, &tracker.reporter.borrow())?;
            return Ok(Self {
                element,
                tracker,
                observer: None,
                attributes: None,
                backdrop,
                _listeners: Vec::new(),
            });
        }

        {
            let mut registry = registry.borrow_mut();
            registry.attach_node(id, Rc::clone(&tracker.node));
            tracker.reporter.borrow_mut().mount(&mut registry);
        }
        tracker.schedule_poll();

        let observer = {
            let tracker = Rc::clone(&tracker);
            let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
                tracker.resized();
            });
            let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
            observer.observe(&element);
            (observer, callback)
        };

        let attributes = {
            let tracker = Rc::clone(&tracker);
            let target = element.clone();
            let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_records: js_sys::Array| {
                tracker.restyled(&target);
            });
            let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
            let filter: js_sys::Array = TEMPLATE_ATTRS.iter().map(|name| JsValue::from_str(name)).collect();
            let init = MutationObserverInit::new();
            init.set_attributes(true);
            init.set_attribute_filter(&filter);
            observer.observe_with_options(&element, &init)?;
            (observer, callback)
        };

        let listeners = scroll_listeners(&element, &tracker)?;
        log::debug!("tracking container {id}");

        Ok(Self {
            element,
            tracker,
            observer: Some(observer),
            attributes: Some(attributes),
            backdrop: None,
            _listeners: listeners,
        })
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    pub fn is_connected(&self) -> bool {
        self.element.is_connected()
    }
}

impl Drop for ContainerBinding {
    fn drop(&mut self) {
        if let Some((observer, _)) = &self.observer {
            observer.disconnect();
        }
        if let Some((observer, _)) = &self.attributes {
            observer.disconnect();
        }
        self.tracker.poll_frame.borrow_mut().take();
        self.tracker.scroll_frame.borrow_mut().take();
        if let Some(backdrop) = &self.backdrop {
            backdrop.remove();
        }
        let _ = self.element.remove_attribute(BOUND_ATTR);
        match self.tracker.registry.try_borrow_mut() {
            Ok(mut registry) => self.tracker.reporter.borrow_mut().unmount(&mut registry),
            Err(_) => log::warn!("registry busy while dropping container, shape left registered"),
        }
    }
}

/// Scroll listeners on every scrolling ancestor plus the window
fn scroll_listeners(element: &HtmlElement, tracker: &Rc<Tracker>) -> Result<Vec<EventListener>, JsValue> {
    let window = dom::window()?;
    let options = EventListenerOptions::run_in_capture_phase();
    let mut listeners = Vec::new();

    let mut ancestor = element.parent_element();
    while let Some(el) = ancestor {
        let scrolls = window
            .get_computed_style(&el)
            .ok()
            .flatten()
            .map(|style| {
                is_scroll_container(
                    &style.get_property_value("overflow").unwrap_or_default(),
                    &style.get_property_value("overflow-y").unwrap_or_default(),
                    el.scroll_height(),
                    el.client_height(),
                )
            })
            .unwrap_or(false);
        if scrolls {
            let tracker = Rc::clone(tracker);
            listeners.push(EventListener::new_with_options(&el, "scroll", options, move |_| {
                tracker.schedule_scroll();
            }));
        }
        ancestor = el.parent_element();
    }

    let tracker = Rc::clone(tracker);
    listeners.push(EventListener::new_with_options(&window, "scroll", options, move |_| {
        tracker.schedule_scroll();
    }));
    Ok(listeners)
}

/// Blurred copy of the container's background for platforms without
/// DOM filter support
fn mount_local_backdrop(
    element: &HtmlElement,
    reporter: &BoundsReporter<ElementTarget>,
) -> Result<Option<HtmlElement>, JsValue> {
    let Some(css) = reporter.local_backdrop_css() else {
        return Ok(None);
    };
    let document = dom::document()?;
    let backdrop = dom::create_div(&document, &css)?;
    backdrop.set_attribute("aria-hidden", "true")?;
    element.prepend_with_node_1(&backdrop)?;
    if element.style().get_property_value("position").unwrap_or_default().is_empty() {
        dom::set_style(element, "position", "relative");
    }
    Ok(Some(backdrop))
}
