//! Shape descriptors held by the registry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::DEFAULT_CORNER_RADIUS;
use crate::geom::Bounds;

/// Opaque identity of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goo-{}", self.0)
    }
}

/// How a shape is painted in the composite layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Plain filled rectangle
    Rectangle,
    /// Filled rectangle with rounded corners
    #[default]
    Rounded,
    /// Caller-supplied vector content
    Custom,
}

/// Visual style of a shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub background_color: Option<String>,
    /// Background image or gradient (CSS value)
    pub background_image: Option<String>,
    /// Corner radius (CSS length); `Rounded` shapes fall back to the default
    pub corner_radius: Option<String>,
    /// Extra declarations appended after everything else, in order
    pub extra: Vec<(String, String)>,
}

impl ShapeStyle {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            background_color: Some(color.into()),
            ..Default::default()
        }
    }

    pub fn with_corner_radius(mut self, radius: impl Into<String>) -> Self {
        self.corner_radius = Some(radius.into());
        self
    }

    pub fn with_extra(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((property.into(), value.into()));
        self
    }
}

/// One registered visual container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeEntry {
    pub bounds: Bounds,
    pub kind: ShapeKind,
    pub style: ShapeStyle,
    /// SVG markup, only used when `kind` is `Custom`
    pub custom_content: Option<String>,
    pub z_index: Option<i32>,
    pub scale: Option<f32>,
}

impl ShapeEntry {
    pub fn new(bounds: Bounds, kind: ShapeKind) -> Self {
        Self {
            bounds,
            kind,
            ..Default::default()
        }
    }

    pub fn rounded(bounds: Bounds, style: ShapeStyle) -> Self {
        Self {
            bounds,
            kind: ShapeKind::Rounded,
            style,
            ..Default::default()
        }
    }

    pub fn custom(bounds: Bounds, markup: impl Into<String>) -> Self {
        Self {
            bounds,
            kind: ShapeKind::Custom,
            custom_content: Some(markup.into()),
            ..Default::default()
        }
    }

    /// Horizontal gradient strip used to bridge neighbouring cards
    pub fn gradient_bridge(bounds: Bounds, colors: &[&str]) -> Self {
        let style = ShapeStyle {
            background_image: Some(format!("linear-gradient(90deg, {})", colors.join(", "))),
            corner_radius: Some("0.375rem".to_string()),
            extra: vec![("background-size".to_string(), "200% 200%".to_string())],
            ..Default::default()
        };
        Self::rounded(bounds, style)
    }

    /// Template described by a container's `data-goo*` attributes.
    ///
    /// - `data-goo`: `rounded` (default), `rect`, `bridge`, `custom`
    /// - `data-goo-colors`: comma-separated stops for `bridge`
    /// - `data-goo-content`: markup for `custom`
    /// - `data-goo-color`, `data-goo-image`, `data-goo-radius`
    /// - `data-goo-bg-size`, `data-goo-style` (`prop: value; ...`)
    /// - `data-goo-z`, `data-goo-scale`
    pub fn from_attributes(attr: impl Fn(&str) -> Option<String>) -> Self {
        let kind = attr("data-goo").unwrap_or_default();
        let mut entry = match kind.trim() {
            "rect" | "rectangle" => Self::new(Bounds::default(), ShapeKind::Rectangle),
            "bridge" => {
                let raw = attr("data-goo-colors").unwrap_or_default();
                let colors: Vec<&str> = raw.split(',').map(str::trim).filter(|c| !c.is_empty()).collect();
                Self::gradient_bridge(Bounds::default(), &colors)
            }
            "custom" => match attr("data-goo-content") {
                Some(markup) => Self::custom(Bounds::default(), markup),
                None => Self::new(Bounds::default(), ShapeKind::Rounded),
            },
            _ => Self::new(Bounds::default(), ShapeKind::Rounded),
        };

        if let Some(color) = attr("data-goo-color") {
            entry.style.background_color = Some(color);
        }
        if let Some(image) = attr("data-goo-image") {
            entry.style.background_image = Some(image);
        }
        if let Some(radius) = attr("data-goo-radius") {
            entry.style.corner_radius = Some(radius);
        }
        if let Some(size) = attr("data-goo-bg-size") {
            entry.style.extra.retain(|(prop, _)| prop != "background-size");
            entry.style.extra.push(("background-size".to_string(), size));
        }
        if let Some(declarations) = attr("data-goo-style") {
            entry.style.extra.extend(parse_declarations(&declarations));
        }
        entry.z_index = attr("data-goo-z").and_then(|z| z.trim().parse().ok());
        entry.scale = attr("data-goo-scale")
            .and_then(|s| s.trim().parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0);
        entry
    }

    pub fn with_bounds(&self, bounds: Bounds) -> Self {
        Self {
            bounds,
            ..self.clone()
        }
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Corner radius actually painted (only `Rounded` shapes have one)
    pub fn effective_corner_radius(&self) -> Option<&str> {
        match self.kind {
            ShapeKind::Rounded => Some(
                self.style
                    .corner_radius
                    .as_deref()
                    .unwrap_or(DEFAULT_CORNER_RADIUS),
            ),
            _ => None,
        }
    }
}

/// `prop: value; prop: value` into ordered pairs, skipping malformed parts
fn parse_declarations(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let (prop, value) = (prop.trim(), value.trim());
            (!prop.is_empty() && !value.is_empty()).then(|| (prop.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_defaults_corner_radius() {
        let entry = ShapeEntry::rounded(Bounds::default(), ShapeStyle::color("#fff"));
        assert_eq!(entry.effective_corner_radius(), Some(DEFAULT_CORNER_RADIUS));

        let rect = ShapeEntry::new(Bounds::default(), ShapeKind::Rectangle);
        assert_eq!(rect.effective_corner_radius(), None);
    }

    #[test]
    fn test_gradient_bridge_style() {
        let entry = ShapeEntry::gradient_bridge(Bounds::default(), &["#f00", "#00f"]);
        assert_eq!(
            entry.style.background_image.as_deref(),
            Some("linear-gradient(90deg, #f00, #00f)")
        );
        assert_eq!(entry.effective_corner_radius(), Some("0.375rem"));
    }

    fn attrs<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_attributes_default_to_rounded() {
        let entry = ShapeEntry::from_attributes(attrs(&[("data-goo", ""), ("data-goo-color", "#E6DFD7")]));
        assert_eq!(entry.kind, ShapeKind::Rounded);
        assert_eq!(entry.style.background_color.as_deref(), Some("#E6DFD7"));
        assert_eq!(entry.scale, None);
        assert_eq!(entry.z_index, None);
    }

    #[test]
    fn test_bridge_attributes() {
        let entry = ShapeEntry::from_attributes(attrs(&[
            ("data-goo", "bridge"),
            ("data-goo-colors", "#C9D5E2, #F6E2B2,"),
            ("data-goo-bg-size", "300% 100%"),
        ]));
        assert_eq!(
            entry.style.background_image.as_deref(),
            Some("linear-gradient(90deg, #C9D5E2, #F6E2B2)")
        );
        assert_eq!(entry.style.extra, vec![("background-size".to_string(), "300% 100%".to_string())]);
    }

    #[test]
    fn test_custom_scale_z_and_style_attributes() {
        let entry = ShapeEntry::from_attributes(attrs(&[
            ("data-goo", "custom"),
            ("data-goo-content", "<svg></svg>"),
            ("data-goo-scale", "1.2"),
            ("data-goo-z", "5"),
            ("data-goo-style", "opacity: 0.8; broken; mix-blend-mode: multiply"),
        ]));
        assert_eq!(entry.kind, ShapeKind::Custom);
        assert_eq!(entry.custom_content.as_deref(), Some("<svg></svg>"));
        assert_eq!(entry.scale, Some(1.2));
        assert_eq!(entry.z_index, Some(5));
        assert_eq!(
            entry.style.extra,
            vec![
                ("opacity".to_string(), "0.8".to_string()),
                ("mix-blend-mode".to_string(), "multiply".to_string()),
            ]
        );

        let bad_scale = ShapeEntry::from_attributes(attrs(&[("data-goo-scale", "-1")]));
        assert_eq!(bad_scale.scale, None);
    }

    #[test]
    fn test_with_bounds_keeps_style() {
        let entry = ShapeEntry::rounded(Bounds::default(), ShapeStyle::color("red")).with_z_index(3);
        let moved = entry.with_bounds(Bounds::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(moved.style, entry.style);
        assert_eq!(moved.z_index, Some(3));
        assert_eq!(moved.bounds.width, 3.0);
    }
}
