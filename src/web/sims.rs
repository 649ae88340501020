//! Views for the decorative simulations
//!
//! - `[data-goo-cluster="header"]`: header blob cluster
//! - `[data-goo-cluster="tech"]`: draggable tech graph card
//! - `[data-goo-pills]`: rigid-body pill board
//!
//! Every view writes transforms straight to its own elements each frame;
//! none of them go through the shape registry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use gloo::render::{AnimationFrame, request_animation_frame};
use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlElement, PointerEvent, ResizeObserver};

use super::dom;
use crate::filter::GooFilter;
use crate::platform::Capabilities;
use crate::presets::{self, HEADER_SEED, PillConfig, TECH_GRAPH_SEED, TechCategory};
use crate::settings::Settings;
use crate::sim::{ClusterBody, PillBoard, PillTuning, ParticleCluster};

pub const CLUSTER_SELECTOR: &str = "[data-goo-cluster]";
pub const PILLS_SELECTOR: &str = "[data-goo-pills]";
/// Marks elements that already host a simulation
pub const SIM_BOUND_ATTR: &str = "data-goo-sim-bound";

type Observer = (ResizeObserver, Closure<dyn FnMut(js_sys::Array)>);

fn observe_resize(target: &HtmlElement, mut on_resize: impl FnMut() + 'static) -> Result<Observer, JsValue> {
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| on_resize());
    let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(target);
    Ok((observer, callback))
}

/// Milliseconds since the previous frame (0 on the first)
fn frame_delta(last: &Cell<Option<f64>>, now: f64) -> f64 {
    let delta = last.get().map_or(0.0, |prev| (now - prev).max(0.0));
    last.set(Some(now));
    delta
}

fn pointer_in(el: &HtmlElement, event: &Event) -> Option<Vec2> {
    let event = event.dyn_ref::<PointerEvent>()?;
    Some(dom::local_point(el, event.client_x(), event.client_y()))
}

fn ensure_positioned(el: &HtmlElement) {
    let positioned = dom::window()
        .ok()
        .and_then(|w| w.get_computed_style(el).ok().flatten())
        .and_then(|s| s.get_property_value("position").ok())
        .is_some_and(|p| p != "static");
    if !positioned {
        dom::set_style(el, "position", "relative");
    }
}

/// Which cluster a container hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Header,
    TechGraph,
}

impl ClusterKind {
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "header" => Some(ClusterKind::Header),
            "tech" | "tech-graph" => Some(ClusterKind::TechGraph),
            _ => None,
        }
    }

    fn filter(&self) -> GooFilter {
        match self {
            ClusterKind::Header => GooFilter::header(),
            ClusterKind::TechGraph => GooFilter::tech_graph(),
        }
    }

    fn bodies(&self, settings: &Settings) -> Vec<ClusterBody> {
        match self {
            ClusterKind::Header => presets::header_blobs(settings.header_blob_count, HEADER_SEED),
            ClusterKind::TechGraph => presets::tech_graph_nodes(TECH_GRAPH_SEED),
        }
    }

    fn cluster(&self, settings: &Settings) -> ParticleCluster {
        let params = match self {
            ClusterKind::Header => settings.header,
            ClusterKind::TechGraph => settings.tech_graph,
        };
        ParticleCluster::new(self.bodies(settings), params)
    }
}

struct ClusterState {
    container: HtmlElement,
    kind: ClusterKind,
    cluster: RefCell<ParticleCluster>,
    blobs: Vec<HtmlElement>,
    labels: Vec<HtmlElement>,
    last_time: Cell<Option<f64>>,
    frame: RefCell<Option<AnimationFrame>>,
}

impl ClusterState {
    fn write_transforms(&self) {
        let transforms = self.cluster.borrow().transforms();
        for (i, transform) in transforms.iter().enumerate() {
            if let Some(el) = self.blobs.get(i) {
                dom::set_style(el, "transform", transform);
            }
            if let Some(el) = self.labels.get(i) {
                dom::set_style(el, "transform", transform);
            }
        }
    }

    fn resized(&self) {
        let bounds = dom::client_bounds(&self.container);
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return;
        }
        let reset = self.kind == ClusterKind::TechGraph;
        self.cluster.borrow_mut().set_bounds(bounds.width, bounds.height, reset);
        self.write_transforms();
    }

    fn schedule(self: &Rc<Self>) {
        let state = Rc::clone(self);
        let handle = request_animation_frame(move |time| {
            state.frame.borrow_mut().take();
            let dt = frame_delta(&state.last_time, time) / 1000.0;
            state.cluster.borrow_mut().tick(dt as f32);
            state.write_transforms();
            state.schedule();
        });
        *self.frame.borrow_mut() = Some(handle);
    }
}

/// A mounted cluster; dropping it stops the loop and removes its elements
pub struct ClusterBinding {
    state: Rc<ClusterState>,
    observer: Observer,
    mounted: Vec<HtmlElement>,
    _listeners: Vec<EventListener>,
}

impl ClusterBinding {
    pub fn mount(
        container: HtmlElement,
        kind: ClusterKind,
        settings: &Settings,
        caps: &Capabilities,
    ) -> Result<Self, JsValue> {
        let document = dom::document()?;
        let filter = kind.filter();
        ensure_positioned(&container);
        let defs = dom::mount_filter_defs(&document, &container, &filter.to_svg())?;

        let mut layer_css = String::from(
            "position: absolute; inset: 0; will-change: filter; transform: translateZ(0);",
        );
        if kind == ClusterKind::Header {
            layer_css.push_str(" pointer-events: none;");
        } else {
            layer_css.push_str(" z-index: 10;");
        }
        if caps.dom_filters {
            let url = filter.css_url();
            layer_css.push_str(&format!(" filter: {url}; -webkit-filter: {url};"));
        }
        let layer = dom::create_div(&document, &layer_css)?;
        container.append_child(&layer)?;

        let cluster = kind.cluster(settings);
        let mut blobs = Vec::with_capacity(cluster.bodies().len());
        for body in cluster.bodies() {
            let blob = body_element(&document, body)?;
            layer.append_child(&blob)?;
            blobs.push(blob);
        }

        let mut mounted = vec![defs, layer];
        let mut labels = Vec::new();
        if kind == ClusterKind::TechGraph {
            let overlay = dom::create_div(&document, "position: absolute; inset: 0; z-index: 20;")?;
            for body in cluster.bodies() {
                let label = dom::create_div(
                    &document,
                    "position: absolute; left: 0; top: 0; user-select: none; font-size: 0.75rem; \
                     font-weight: 600; color: #374151; cursor: grab;",
                )?;
                label.set_text_content(body.label.as_deref());
                overlay.append_child(&label)?;
                labels.push(label);
            }
            container.append_child(&overlay)?;
            mounted.push(overlay);
            mounted.push(legend(&document, &container)?);
        }

        let state = Rc::new(ClusterState {
            container: container.clone(),
            kind,
            cluster: RefCell::new(cluster),
            blobs,
            labels,
            last_time: Cell::new(None),
            frame: RefCell::new(None),
        });
        state.resized();
        if !caps.reduced_motion {
            state.schedule();
        }

        let observer = {
            let state = Rc::clone(&state);
            observe_resize(&container, move || state.resized())?
        };
        let listeners = if kind == ClusterKind::TechGraph {
            drag_listeners(&state)?
        } else {
            Vec::new()
        };

        log::info!("mounted {kind:?} cluster ({} bodies)", state.blobs.len());
        Ok(Self {
            state,
            observer,
            mounted,
            _listeners: listeners,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.state.container.is_connected()
    }
}

impl Drop for ClusterBinding {
    fn drop(&mut self) {
        self.observer.0.disconnect();
        self.state.frame.borrow_mut().take();
        let _ = self.state.container.remove_attribute(SIM_BOUND_ATTR);
        for el in &self.mounted {
            el.remove();
        }
    }
}

fn body_element(document: &Document, body: &ClusterBody) -> Result<HtmlElement, JsValue> {
    dom::create_div(
        document,
        &format!(
            "position: absolute; left: 0; top: 0; width: {}px; height: {}px; border-radius: 9999px; \
             opacity: 0.8; background-color: {}; will-change: transform;",
            body.footprint.x, body.footprint.y, body.color
        ),
    )
}

/// Screen-reader list of categories and their nodes
fn legend(document: &Document, container: &HtmlElement) -> Result<HtmlElement, JsValue> {
    let list = document.create_element("ul")?.dyn_into::<HtmlElement>()?;
    list.set_attribute(
        "style",
        "position: absolute; width: 1px; height: 1px; overflow: hidden; clip: rect(0 0 0 0);",
    )?;
    for category in TechCategory::ALL {
        let nodes: Vec<&str> = presets::TECH_NODES
            .iter()
            .filter(|(_, c)| *c == category)
            .map(|(label, _)| *label)
            .collect();
        let item = document.create_element("li")?;
        item.set_text_content(Some(&format!("{}: {}", category.label(), nodes.join(", "))));
        list.append_child(&item)?;
    }
    container.append_child(&list)?;
    Ok(list)
}

fn drag_listeners(state: &Rc<ClusterState>) -> Result<Vec<EventListener>, JsValue> {
    let window = dom::window()?;
    let mut listeners = Vec::new();

    {
        let state = Rc::clone(state);
        let container = state.container.clone();
        listeners.push(EventListener::new(&container, "pointerdown", move |event| {
            let Some(pointer) = pointer_in(&state.container, event) else {
                return;
            };
            let mut cluster = state.cluster.borrow_mut();
            if let Some(index) = cluster.hit_test(pointer) {
                cluster.begin_drag(index, pointer);
            }
        }));
    }
    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&window, "pointermove", move |event| {
            if state.cluster.borrow().dragged().is_none() {
                return;
            }
            let Some(pointer) = pointer_in(&state.container, event) else {
                return;
            };
            state.cluster.borrow_mut().drag_to(pointer);
            state.write_transforms();
        }));
    }
    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&window, "pointerup", move |_| {
            state.cluster.borrow_mut().end_drag();
        }));
    }
    Ok(listeners)
}

struct PillState {
    container: HtmlElement,
    configs: Vec<PillConfig>,
    tuning: PillTuning,
    animate: bool,
    board: RefCell<Option<PillBoard>>,
    pills: Vec<HtmlElement>,
    last_time: Cell<Option<f64>>,
    frame: RefCell<Option<AnimationFrame>>,
}

impl PillState {
    fn resized(&self) {
        let bounds = dom::client_bounds(&self.container);
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return;
        }
        if !self.animate {
            let positions = presets::static_layout(&self.configs, bounds.width, bounds.height);
            for (el, p) in self.pills.iter().zip(positions) {
                dom::set_style(
                    el,
                    "transform",
                    &format!("translate3d({}px, {}px, 0) translate(-50%, -50%)", p.x, p.y),
                );
            }
            return;
        }
        let mut board = self.board.borrow_mut();
        match board.as_mut() {
            Some(board) => board.set_bounds(bounds.width, bounds.height),
            // Spawn only once the board has a real size
            None => {
                *board = Some(presets::pill_board(&self.configs, bounds.width, bounds.height, self.tuning));
            }
        }
    }

    fn write_transforms(&self) {
        let board = self.board.borrow();
        let Some(board) = board.as_ref() else {
            return;
        };
        for (el, transform) in self.pills.iter().zip(board.transforms()) {
            dom::set_style(el, "transform", &transform);
        }
    }

    fn schedule(self: &Rc<Self>) {
        let state = Rc::clone(self);
        let handle = request_animation_frame(move |time| {
            state.frame.borrow_mut().take();
            let delta = frame_delta(&state.last_time, time) as f32;
            if let Some(board) = state.board.borrow_mut().as_mut() {
                board.frame(delta);
            }
            state.write_transforms();
            state.schedule();
        });
        *self.frame.borrow_mut() = Some(handle);
    }

    fn with_board(&self, f: impl FnOnce(&mut PillBoard)) {
        if let Some(board) = self.board.borrow_mut().as_mut() {
            f(board);
        }
    }
}

/// A mounted pill board
pub struct PillBinding {
    state: Rc<PillState>,
    observer: Observer,
    _listeners: Vec<EventListener>,
}

impl PillBinding {
    pub fn mount(container: HtmlElement, settings: &Settings, caps: &Capabilities) -> Result<Self, JsValue> {
        let document = dom::document()?;
        ensure_positioned(&container);
        dom::set_style(&container, "overflow", "hidden");
        dom::set_style(&container, "touch-action", "none");

        let configs = presets::pill_configs();
        let mut pills = Vec::with_capacity(configs.len());
        for config in &configs {
            let pill = dom::create_div(
                &document,
                &format!(
                    "position: absolute; left: 0; top: 0; width: {}px; height: {}px; border-radius: 9999px; \
                     background-color: {}; display: flex; align-items: center; justify-content: center; \
                     user-select: none; cursor: grab; will-change: transform;",
                    config.width, config.height, config.color
                ),
            )?;
            pill.set_text_content(Some(&config.label));
            container.append_child(&pill)?;
            pills.push(pill);
        }

        let animate = !caps.reduced_motion;
        let state = Rc::new(PillState {
            container: container.clone(),
            configs,
            tuning: settings.pills,
            animate,
            board: RefCell::new(None),
            pills,
            last_time: Cell::new(None),
            frame: RefCell::new(None),
        });
        state.resized();

        let observer = {
            let state = Rc::clone(&state);
            observe_resize(&container, move || state.resized())?
        };

        let listeners = if animate {
            state.schedule();
            pointer_listeners(&state)?
        } else {
            Vec::new()
        };

        log::info!("mounted pill board (animated: {animate})");
        Ok(Self {
            state,
            observer,
            _listeners: listeners,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.state.container.is_connected()
    }
}

impl Drop for PillBinding {
    fn drop(&mut self) {
        self.observer.0.disconnect();
        self.state.frame.borrow_mut().take();
        let _ = self.state.container.remove_attribute(SIM_BOUND_ATTR);
        for pill in &self.state.pills {
            pill.remove();
        }
    }
}

fn pointer_listeners(state: &Rc<PillState>) -> Result<Vec<EventListener>, JsValue> {
    let window = dom::window()?;
    let container = state.container.clone();
    let mut listeners = Vec::new();

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&container, "pointermove", move |event| {
            let pointer = pointer_in(&state.container, event);
            state.with_board(|board| board.set_pointer(pointer));
        }));
    }
    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&container, "pointerleave", move |_| {
            state.with_board(|board| board.set_pointer(None));
        }));
    }
    {
        let state = Rc::clone(state);
        let options = EventListenerOptions::enable_prevent_default();
        listeners.push(EventListener::new_with_options(&container, "pointerdown", options, move |event| {
            let Some(pointer) = pointer_in(&state.container, event) else {
                return;
            };
            let mut grabbed = false;
            state.with_board(|board| grabbed = board.grab(pointer));
            if grabbed {
                event.prevent_default();
            }
        }));
    }
    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&window, "pointerup", move |_| {
            state.with_board(|board| board.release());
        }));
    }
    Ok(listeners)
}
