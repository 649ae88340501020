//! Goo filter definitions
//!
//! Gaussian blur -> color-matrix alpha threshold -> optional softening blur.
//! The blur radius is the merge distance: shapes whose edges are closer than
//! it fuse into one silhouette. Every call site owns its own filter.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::geom::Bounds;

/// `color-interpolation-filters` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorInterpolation {
    Auto,
    #[default]
    SRgb,
    LinearRgb,
}

impl ColorInterpolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorInterpolation::Auto => "auto",
            ColorInterpolation::SRgb => "sRGB",
            ColorInterpolation::LinearRgb => "linearRGB",
        }
    }
}

/// Alpha threshold step: RGB pass through, `alpha' = gain * alpha + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaThreshold {
    pub gain: f32,
    pub offset: f32,
}

impl Default for AlphaThreshold {
    fn default() -> Self {
        Self {
            gain: 18.0,
            offset: -7.0,
        }
    }
}

impl AlphaThreshold {
    pub const fn new(gain: f32, offset: f32) -> Self {
        Self { gain, offset }
    }

    /// `feColorMatrix` values string
    pub fn matrix_values(&self) -> String {
        format!(
            "1 0 0 0 0  0 1 0 0 0  0 0 1 0 0  0 0 0 {} {}",
            self.gain, self.offset
        )
    }

    /// Output alpha for a blurred input alpha (clamped like the compositor does)
    pub fn apply(&self, alpha: f32) -> f32 {
        (self.gain * alpha + self.offset).clamp(0.0, 1.0)
    }

    /// Input alpha at which the output crosses 50% (the visible edge)
    pub fn edge_alpha(&self) -> f32 {
        (0.5 - self.offset) / self.gain
    }
}

/// One SVG goo filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GooFilter {
    pub id: String,
    pub std_deviation: f32,
    pub threshold: AlphaThreshold,
    pub additional_blur: Option<f32>,
    pub color_interpolation: ColorInterpolation,
}

impl GooFilter {
    pub fn new(id: impl Into<String>, std_deviation: f32) -> Self {
        Self {
            id: id.into(),
            std_deviation,
            threshold: AlphaThreshold::default(),
            additional_blur: None,
            color_interpolation: ColorInterpolation::default(),
        }
    }

    pub fn with_threshold(mut self, gain: f32, offset: f32) -> Self {
        self.threshold = AlphaThreshold::new(gain, offset);
        self
    }

    pub fn with_additional_blur(mut self, blur: f32) -> Self {
        self.additional_blur = Some(blur);
        self
    }

    /// Filter used by the shared composite layer; narrower on mobile viewports
    pub fn container(viewport_width: f32) -> Self {
        let radius = if viewport_width < MOBILE_BREAKPOINT {
            CONTAINER_BLUR_MOBILE
        } else {
            CONTAINER_BLUR_DESKTOP
        };
        Self::new("gooeyContainerFilter", radius).with_additional_blur(CONTAINER_EXTRA_BLUR)
    }

    /// Header blob cluster
    pub fn header() -> Self {
        Self::new("headerGooey", 40.0)
    }

    /// Tech graph card
    pub fn tech_graph() -> Self {
        Self::new("techGooeyCard", 30.0).with_threshold(10.0, -5.0)
    }

    /// Merge distance between shape edges
    pub fn merge_distance(&self) -> f32 {
        self.std_deviation
    }

    /// Whether two shapes fuse into one silhouette under this filter
    pub fn fuses(&self, a: &Bounds, b: &Bounds) -> bool {
        a.edge_gap(b) <= self.merge_distance()
    }

    /// CSS `filter` value referencing this filter
    pub fn css_url(&self) -> String {
        format!("url(#{})", self.id)
    }

    /// Hidden `<svg>` holding the filter definition
    pub fn to_svg(&self) -> String {
        let mut svg = String::with_capacity(512);
        svg.push_str(
            "<svg width=\"1\" height=\"1\" aria-hidden=\"true\" \
             style=\"position:absolute;left:-9999px;top:-9999px;overflow:hidden\">",
        );
        svg.push_str("<defs>");
        svg.push_str(&format!(
            "<filter id=\"{}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\" \
             filterUnits=\"objectBoundingBox\" color-interpolation-filters=\"{}\">",
            self.id,
            self.color_interpolation.as_str()
        ));
        svg.push_str(&format!(
            "<feGaussianBlur in=\"SourceGraphic\" stdDeviation=\"{}\" result=\"blur\"/>",
            self.std_deviation
        ));
        svg.push_str(&format!(
            "<feColorMatrix in=\"blur\" mode=\"matrix\" values=\"{}\" result=\"gooey\"/>",
            self.threshold.matrix_values()
        ));
        if let Some(blur) = self.additional_blur.filter(|b| *b > 0.0) {
            svg.push_str(&format!(
                "<feGaussianBlur in=\"gooey\" stdDeviation=\"{blur}\" result=\"gooeyBlur\"/>"
            ));
        }
        svg.push_str("</filter></defs></svg>");
        svg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_near_binary() {
        let t = AlphaThreshold::default();
        assert_eq!(t.apply(0.0), 0.0);
        assert_eq!(t.apply(0.3), 0.0);
        assert_eq!(t.apply(0.5), 1.0);
        assert_eq!(t.apply(1.0), 1.0);
        assert!((t.edge_alpha() - 7.5 / 18.0).abs() < 1e-6);
    }

    #[test]
    fn test_container_filter_is_responsive() {
        assert_eq!(GooFilter::container(1280.0).std_deviation, 50.0);
        assert_eq!(GooFilter::container(375.0).std_deviation, 40.0);
        assert_eq!(GooFilter::container(768.0).std_deviation, 50.0);
        assert_eq!(GooFilter::container(375.0).additional_blur, Some(12.0));
    }

    #[test]
    fn test_overlapping_shapes_fuse() {
        let filter = GooFilter::header();
        let a = Bounds::new(0.0, 0.0, 50.0, 50.0);
        let b = Bounds::new(40.0, 0.0, 50.0, 50.0);
        assert!(filter.fuses(&a, &b));

        let far = Bounds::new(200.0, 0.0, 50.0, 50.0);
        assert!(!filter.fuses(&a, &far));
        // Exactly at the merge distance still fuses
        let edge = Bounds::new(90.0, 0.0, 50.0, 50.0);
        assert!(filter.fuses(&a, &edge));
    }

    #[test]
    fn test_svg_markup() {
        let svg = GooFilter::tech_graph().to_svg();
        assert!(svg.contains("id=\"techGooeyCard\""));
        assert!(svg.contains("stdDeviation=\"30\""));
        assert!(svg.contains("values=\"1 0 0 0 0  0 1 0 0 0  0 0 1 0 0  0 0 0 10 -5\""));
        assert!(!svg.contains("gooeyBlur"));

        let svg = GooFilter::container(1024.0).to_svg();
        assert!(svg.contains("in=\"gooey\" stdDeviation=\"12\""));
        assert!(svg.contains("color-interpolation-filters=\"sRGB\""));
    }
}
