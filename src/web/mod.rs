//! Browser glue (wasm32 only)
//!
//! `GooShell` owns the registry, the composite layer view and every live
//! binding. Markup opts in through data attributes:
//! - `[data-goo]`: container merged into the layer
//! - `[data-goo-hover]`: cursor hover target
//! - `[data-goo-cluster]`, `[data-goo-pills]`: decorative simulations

pub mod container;
pub mod cursor_view;
pub mod dom;
pub mod layer_view;
pub mod scheduler;
pub mod sims;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo::events::EventListener;
use gloo::render::{AnimationFrame, request_animation_frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, MutationObserver, MutationObserverInit};

use crate::layer::CompositeLayer;
use crate::platform::Capabilities;
use crate::registry::{ShapeMap, ShapeRegistry};
use crate::settings::Settings;
use container::{CONTAINER_SELECTOR, ContainerBinding};
use cursor_view::CursorBinding;
use layer_view::LayerView;
use scheduler::RafScheduler;
use sims::{CLUSTER_SELECTOR, ClusterBinding, ClusterKind, PILLS_SELECTOR, PillBinding, SIM_BOUND_ATTR};

/// Everything mounted on the page
struct Bindings {
    containers: Vec<ContainerBinding>,
    clusters: Vec<ClusterBinding>,
    pills: Vec<PillBinding>,
    cursor: Option<CursorBinding>,
}

pub struct GooShell {
    settings: Settings,
    caps: Capabilities,
    registry: Rc<RefCell<ShapeRegistry>>,
    view: Rc<LayerView>,
    bindings: RefCell<Bindings>,
    route: RefCell<String>,
    route_frame: RefCell<Option<AnimationFrame>>,
    scan_frame: RefCell<Option<AnimationFrame>>,
    mutations: RefCell<Option<(MutationObserver, Closure<dyn FnMut(js_sys::Array)>)>>,
    listeners: RefCell<Vec<EventListener>>,
}

impl GooShell {
    /// Mount the layer and bind every opted-in element on the page
    pub fn init(settings: Settings) -> Result<Rc<Self>, JsValue> {
        let document = dom::document()?;
        let caps = settings.apply_to(Capabilities::detect());

        let registry = Rc::new_cyclic(|weak| RefCell::new(ShapeRegistry::new(RafScheduler::new(weak.clone()))));
        let filter = settings.container_filter(dom::viewport_width());
        let mut layer = CompositeLayer::new(filter, caps);
        layer.layer_blur = settings.layer_blur;
        let view = LayerView::mount(&document, layer)?;
        {
            let view = Rc::clone(&view);
            registry
                .borrow_mut()
                .subscribe(Box::new(move |shapes: &ShapeMap| view.render(shapes)));
        }

        let path = dom::current_path();
        registry.borrow_mut().route_changed(&path);

        let cursor = if settings.cursor_enabled && !caps.reduced_motion {
            Some(CursorBinding::mount(&registry, &view, settings.cursor.clone())?)
        } else {
            None
        };

        let shell = Rc::new(Self {
            settings,
            caps,
            registry,
            view,
            bindings: RefCell::new(Bindings {
                containers: Vec::new(),
                clusters: Vec::new(),
                pills: Vec::new(),
                cursor,
            }),
            route: RefCell::new(path),
            route_frame: RefCell::new(None),
            scan_frame: RefCell::new(None),
            mutations: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });
        shell.scan();
        shell.install_listeners()?;
        shell.observe_mutations(&document)?;
        shell.watch_route();

        let bindings = shell.bindings.borrow();
        log::info!(
            "goo shell ready: {} containers, {} clusters, {} pill boards",
            bindings.containers.len(),
            bindings.clusters.len(),
            bindings.pills.len()
        );
        drop(bindings);
        Ok(shell)
    }

    /// Drop bindings whose elements left the document, bind new ones
    fn scan(&self) {
        let Ok(document) = dom::document() else {
            return;
        };
        let mut bindings = self.bindings.borrow_mut();
        bindings.containers.retain(ContainerBinding::is_connected);
        bindings.clusters.retain(ClusterBinding::is_connected);
        bindings.pills.retain(PillBinding::is_connected);

        for element in dom::query_all(&document, CONTAINER_SELECTOR) {
            if bindings.containers.iter().any(|b| b.element() == &element) {
                continue;
            }
            match ContainerBinding::mount(&self.registry, &self.view, element, &self.caps) {
                Ok(binding) => bindings.containers.push(binding),
                Err(err) => log::warn!("failed to bind goo container: {err:?}"),
            }
        }

        for element in unbound(&document, CLUSTER_SELECTOR) {
            let Some(kind) = element
                .get_attribute("data-goo-cluster")
                .as_deref()
                .and_then(ClusterKind::from_attr)
            else {
                log::warn!("unknown data-goo-cluster value");
                continue;
            };
            match ClusterBinding::mount(element.clone(), kind, &self.settings, &self.caps) {
                Ok(binding) => {
                    mark_bound(&element);
                    bindings.clusters.push(binding);
                }
                Err(err) => log::warn!("failed to mount {kind:?} cluster: {err:?}"),
            }
        }

        for element in unbound(&document, PILLS_SELECTOR) {
            match PillBinding::mount(element.clone(), &self.settings, &self.caps) {
                Ok(binding) => {
                    mark_bound(&element);
                    bindings.pills.push(binding);
                }
                Err(err) => log::warn!("failed to mount pill board: {err:?}"),
            }
        }
    }

    fn install_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let window = dom::window()?;
        let mut listeners = self.listeners.borrow_mut();
        {
            let shell = Rc::clone(self);
            listeners.push(EventListener::new(&window, "resize", move |_| {
                let filter = shell.settings.container_filter(dom::viewport_width());
                shell.view.set_filter(filter);
            }));
        }
        {
            let shell = Rc::clone(self);
            listeners.push(EventListener::new(&window, "popstate", move |_| {
                shell.check_route();
            }));
        }
        Ok(())
    }

    /// Elements added or removed mid-page are (un)bound on the next frame
    fn observe_mutations(self: &Rc<Self>, document: &web_sys::Document) -> Result<(), JsValue> {
        let Some(body) = document.body() else {
            return Ok(());
        };
        let shell: Weak<Self> = Rc::downgrade(self);
        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_records: js_sys::Array| {
            if let Some(shell) = shell.upgrade() {
                shell.schedule_scan();
            }
        });
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(&body, &init)?;
        *self.mutations.borrow_mut() = Some((observer, callback));
        Ok(())
    }

    fn schedule_scan(self: &Rc<Self>) {
        if self.scan_frame.borrow().is_some() {
            return;
        }
        let shell = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            shell.scan_frame.borrow_mut().take();
            shell.scan();
        });
        *self.scan_frame.borrow_mut() = Some(handle);
    }

    /// History API navigations fire no event; compare the path every frame
    fn watch_route(self: &Rc<Self>) {
        let shell = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            shell.route_frame.borrow_mut().take();
            shell.check_route();
            shell.watch_route();
        });
        *self.route_frame.borrow_mut() = Some(handle);
    }

    fn check_route(&self) {
        let path = dom::current_path();
        if *self.route.borrow() == path {
            return;
        }
        match self.registry.try_borrow_mut() {
            Ok(mut registry) => registry.route_changed(&path),
            // Try again next frame
            Err(_) => return,
        }
        *self.route.borrow_mut() = path;
        if let Some(cursor) = &self.bindings.borrow().cursor {
            cursor.route_changed();
        }
        self.scan();
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn registry(&self) -> &Rc<RefCell<ShapeRegistry>> {
        &self.registry
    }

    /// Unbind everything and remove the layer
    pub fn teardown(&self) {
        if let Some((observer, _)) = self.mutations.borrow_mut().take() {
            observer.disconnect();
        }
        self.scan_frame.borrow_mut().take();
        self.route_frame.borrow_mut().take();
        self.listeners.borrow_mut().clear();
        {
            let mut bindings = self.bindings.borrow_mut();
            bindings.cursor = None;
            bindings.containers.clear();
            bindings.clusters.clear();
            bindings.pills.clear();
        }
        self.view.unmount();
        log::info!("goo shell torn down");
    }
}

fn unbound(document: &web_sys::Document, selector: &str) -> Vec<HtmlElement> {
    dom::query_all(document, selector)
        .into_iter()
        .filter(|el| !el.has_attribute(SIM_BOUND_ATTR))
        .collect()
}

fn mark_bound(element: &HtmlElement) {
    let _ = element.set_attribute(SIM_BOUND_ATTR, "");
}
