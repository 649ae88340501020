//! Effect settings
//!
//! Persisted in LocalStorage so tuning can be overridden without a rebuild.

use serde::{Deserialize, Serialize};

use crate::consts::{CONTAINER_BLUR_DESKTOP, CONTAINER_BLUR_MOBILE, CONTAINER_EXTRA_BLUR, MOBILE_BREAKPOINT};
use crate::cursor::CursorStyle;
use crate::filter::GooFilter;
use crate::platform::Capabilities;
use crate::presets::HEADER_BLOB_COUNT;
use crate::sim::{ClusterParams, PillTuning};

/// Console verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level(&self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Effect settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Filter ===
    /// Container layer blur on wide viewports
    pub blur_desktop: f32,
    /// Container layer blur below the breakpoint
    pub blur_mobile: f32,
    pub mobile_breakpoint: f32,
    /// `blur()` applied after the filter url on the layer container
    pub layer_blur: f32,

    // === Cursor ===
    pub cursor_enabled: bool,
    pub cursor: CursorStyle,

    // === Simulations ===
    pub header_blob_count: usize,
    pub header: ClusterParams,
    pub tech_graph: ClusterParams,
    pub pills: PillTuning,

    // === Diagnostics ===
    pub log_level: LogLevel,

    // === Accessibility ===
    /// Force reduced motion on or off; `None` follows the system preference
    pub reduced_motion: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blur_desktop: CONTAINER_BLUR_DESKTOP,
            blur_mobile: CONTAINER_BLUR_MOBILE,
            mobile_breakpoint: MOBILE_BREAKPOINT,
            layer_blur: CONTAINER_EXTRA_BLUR,

            cursor_enabled: true,
            cursor: CursorStyle::default(),

            header_blob_count: HEADER_BLOB_COUNT,
            header: ClusterParams::HEADER,
            tech_graph: ClusterParams::TECH_GRAPH,
            pills: PillTuning::default(),

            log_level: LogLevel::Info,

            reduced_motion: None,
        }
    }
}

impl Settings {
    /// Layer filter for the current viewport width
    pub fn container_filter(&self, viewport_width: f32) -> GooFilter {
        let blur = if viewport_width < self.mobile_breakpoint {
            self.blur_mobile
        } else {
            self.blur_desktop
        };
        let mut filter = GooFilter::container(viewport_width);
        filter.std_deviation = blur;
        filter
    }

    /// Detected capabilities with the reduced-motion override applied
    pub fn apply_to(&self, caps: Capabilities) -> Capabilities {
        match self.reduced_motion {
            Some(reduced) => caps.with_reduced_motion(reduced),
            None => caps,
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "goo_merge_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
