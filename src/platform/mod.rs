//! Platform capability detection
//!
//! Detected once at startup and threaded through as configuration:
//! - Whether SVG filters apply to HTML elements (Safari cannot)
//! - Reduced-motion preference

use serde::{Deserialize, Serialize};

/// What the host platform can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// `filter: url(#...)` works on non-SVG elements
    pub dom_filters: bool,
    /// The user prefers reduced motion
    pub reduced_motion: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            dom_filters: true,
            reduced_motion: false,
        }
    }
}

impl Capabilities {
    /// Capabilities implied by a user-agent string.
    ///
    /// UA sniffing is brittle; it mirrors the `safari` but not
    /// `chrome`/`android` heuristic the site has always used.
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            dom_filters: !is_safari(user_agent),
            reduced_motion: false,
        }
    }

    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    /// Detect from the browser (wasm only)
    #[cfg(target_arch = "wasm32")]
    pub fn detect() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let user_agent = window.navigator().user_agent().unwrap_or_default();
        let reduced_motion = window
            .match_media("(prefers-reduced-motion: reduce)")
            .ok()
            .flatten()
            .map(|query| query.matches())
            .unwrap_or(false);
        let caps = Self::from_user_agent(&user_agent).with_reduced_motion(reduced_motion);
        log::info!(
            "Capabilities: dom_filters={}, reduced_motion={}",
            caps.dom_filters,
            caps.reduced_motion
        );
        caps
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn detect() -> Self {
        Self::default()
    }
}

/// True when "safari" appears before any "chrome" or "android" (case-insensitive)
pub fn is_safari(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    let Some(safari) = ua.find("safari") else {
        return false;
    };
    let before = &ua[..safari];
    !before.contains("chrome") && !before.contains("android")
}
