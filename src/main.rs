//! Goo Merge entry point
//!
//! On the web this mounts the shell on `start`; natively it runs a short
//! headless pass over the registry and the simulations.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_shell {
    use std::cell::RefCell;
    use std::rc::Rc;

    use goo_merge::Settings;
    use goo_merge::web::GooShell;

    thread_local! {
        static SHELL: RefCell<Option<Rc<GooShell>>> = const { RefCell::new(None) };
    }

    pub fn run() {
        console_error_panic_hook::set_once();

        let settings = Settings::load();
        if console_log::init_with_level(settings.log_level.to_level()).is_err() {
            web_sys::console::warn_1(&"logger already initialized".into());
        }
        log::info!("Goo Merge starting...");

        match GooShell::init(settings) {
            Ok(shell) => SHELL.with(|slot| *slot.borrow_mut() = Some(shell)),
            Err(err) => log::error!("failed to start goo shell: {err:?}"),
        }
    }

    pub fn teardown() {
        if let Some(shell) = SHELL.with(|slot| slot.borrow_mut().take()) {
            shell.teardown();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_shell::run();
}

/// Remove the layer and every binding (page-level unmount)
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn goo_teardown() {
    wasm_shell::teardown();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Goo Merge (native) starting...");
    log::info!("The DOM layer needs a browser - build for wasm32 and serve with `trunk serve`");

    headless::registry_pass();
    headless::cluster_pass();
    headless::pill_pass();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use goo_merge::presets::{self, HEADER_BLOB_COUNT, HEADER_SEED};
    use goo_merge::registry::ManualScheduler;
    use goo_merge::sim::{ClusterParams, ParticleCluster};
    use goo_merge::{Bounds, Capabilities, CompositeLayer, GooFilter, ShapeEntry, ShapeRegistry, ShapeStyle};

    /// Register two neighbouring containers and paint one frame
    pub fn registry_pass() {
        let mut registry = ShapeRegistry::new(ManualScheduler::new());
        let layer = CompositeLayer::new(GooFilter::container(1280.0), Capabilities::default());

        let nav = registry.allocate_id();
        let card = registry.allocate_id();
        let nav_bounds = Bounds::new(24.0, 16.0, 320.0, 56.0);
        let card_bounds = Bounds::new(24.0, 100.0, 320.0, 200.0);
        registry.register(nav, ShapeEntry::rounded(nav_bounds, ShapeStyle::color("#F6E2B2")));
        registry.register(card, ShapeEntry::rounded(card_bounds, ShapeStyle::color("#C9D5E2")));
        registry.update_bounds(card, Bounds::new(24.0, 96.0, 320.0, 200.0));
        registry.flush();

        let frame = layer.render(&registry.published());
        log::info!(
            "layer: {} shapes, filter {:?}, nav/card fuse: {}",
            frame.shapes.len(),
            frame.filter,
            layer.filter.fuses(&nav_bounds, &card_bounds)
        );
        for shape in &frame.shapes {
            log::debug!("{}: {}", shape.id, shape.css());
        }
    }

    /// Let the header cluster settle for two simulated seconds
    pub fn cluster_pass() {
        let blobs = presets::header_blobs(HEADER_BLOB_COUNT, HEADER_SEED);
        let mut cluster = ParticleCluster::new(blobs, ClusterParams::HEADER);
        cluster.set_bounds(960.0, 320.0, false);
        for _ in 0..120 {
            cluster.tick(1.0 / 60.0);
        }
        let drift: f32 = cluster
            .bodies()
            .iter()
            .map(|b| b.position.distance(b.anchor))
            .sum::<f32>()
            / cluster.bodies().len().max(1) as f32;
        log::info!("header cluster: mean distance from anchor {drift:.1}px");
    }

    /// Drop the pill board and report how many pills came to rest
    pub fn pill_pass() {
        let configs = presets::pill_configs();
        let mut board = presets::pill_board(&configs, 720.0, 420.0, Default::default());
        board.set_pointer(Some(glam::Vec2::new(360.0, 420.0)));
        let mut steps = 0;
        for _ in 0..600 {
            steps += board.frame(1000.0 / 60.0);
        }
        let resting = board.world().bodies.iter().filter(|b| b.speed() < 0.5).count();
        log::info!("pill board: {steps} steps, {resting}/{} pills resting", board.len());
    }
}
