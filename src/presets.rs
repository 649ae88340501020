//! Seeded layouts and catalogues for the decorative simulations
//!
//! Everything here is deterministic: the same seed always yields the same
//! anchors.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::sim::{ClusterBody, PillBoard, PillTuning};

pub const HEADER_SEED: u64 = 42;
pub const HEADER_BLOB_COUNT: usize = 12;
pub const HEADER_PALETTE: [&str; 6] = ["#C9D5E2", "#E6DFD7", "#F6E2B2", "#C2D0C1", "#A8BED1", "#D3E0E6"];
/// Header blobs are ellipses: height is this share of the width
pub const HEADER_FOOTPRINT: f32 = 0.7;

pub const TECH_GRAPH_SEED: u64 = 14;
pub const TECH_FOOTPRINT: f32 = 0.62;
pub const TECH_JITTER: f32 = 0.06;

pub const PILL_HEIGHT: f32 = 40.0;
pub const PILL_PADDING_X: f32 = 20.0;
pub const PILL_SPAWN_GAP: f32 = 14.0;
pub const PILL_INSET: f32 = 16.0;
/// Gap between pills in the reduced-motion layout
pub const PILL_STATIC_GAP: f32 = 12.0;

/// Header cluster: `count` blobs sized 110..230 with anchors in the middle 70%
pub fn header_blobs(count: usize, seed: u64) -> Vec<ClusterBody> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..count)
        .map(|index| {
            let size = 110.0 + rng.random::<f32>() * 120.0;
            let anchor = Vec2::new(0.15 + rng.random::<f32>() * 0.7, 0.15 + rng.random::<f32>() * 0.7);
            let color = HEADER_PALETTE[index % HEADER_PALETTE.len()];
            ClusterBody::new(anchor, Vec2::new(size, size * HEADER_FOOTPRINT), color)
        })
        .collect()
}

/// Tech graph node groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechCategory {
    Frontend,
    Backend,
    Data,
    Analytics,
    Ai,
}

impl TechCategory {
    pub const ALL: [TechCategory; 5] = [
        TechCategory::Frontend,
        TechCategory::Backend,
        TechCategory::Data,
        TechCategory::Analytics,
        TechCategory::Ai,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TechCategory::Frontend => "Frontend",
            TechCategory::Backend => "Backend",
            TechCategory::Data => "Data",
            TechCategory::Analytics => "Analytics",
            TechCategory::Ai => "AI Systems",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TechCategory::Frontend => "#9BB7D4",
            TechCategory::Backend => "#B7C8B6",
            TechCategory::Data => "#E3C6A6",
            TechCategory::Analytics => "#C9AFCB",
            TechCategory::Ai => "#A9C5D9",
        }
    }

    /// Group centre as a fraction of the card
    pub fn center(&self) -> Vec2 {
        match self {
            TechCategory::Frontend => Vec2::new(0.22, 0.25),
            TechCategory::Backend => Vec2::new(0.72, 0.25),
            TechCategory::Data => Vec2::new(0.22, 0.62),
            TechCategory::Analytics => Vec2::new(0.72, 0.62),
            TechCategory::Ai => Vec2::new(0.5, 0.85),
        }
    }
}

pub const TECH_NODES: [(&str, TechCategory); 14] = [
    ("React", TechCategory::Frontend),
    ("Next.js", TechCategory::Frontend),
    ("TypeScript", TechCategory::Frontend),
    ("Firebase", TechCategory::Backend),
    ("Google Cloud", TechCategory::Backend),
    ("Docker", TechCategory::Backend),
    ("GraphQL", TechCategory::Data),
    ("Neo4j / Cypher", TechCategory::Data),
    ("SQL", TechCategory::Data),
    ("PostHog", TechCategory::Analytics),
    ("Mixpanel", TechCategory::Analytics),
    ("Sentry", TechCategory::Analytics),
    ("LLM APIs", TechCategory::Ai),
    ("MCP", TechCategory::Ai),
];

/// Node diameter grows with the label
pub fn tech_node_size(label: &str) -> f32 {
    (56.0 + label.chars().count() as f32 * 6.0).max(92.0)
}

/// Tech graph: labelled nodes jittered around their category centre
pub fn tech_graph_nodes(seed: u64) -> Vec<ClusterBody> {
    let mut rng = Pcg32::seed_from_u64(seed);
    TECH_NODES
        .iter()
        .map(|&(label, category)| {
            let size = tech_node_size(label);
            let jitter = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5) * TECH_JITTER;
            ClusterBody::new(category.center() + jitter, Vec2::new(size, size * TECH_FOOTPRINT), category.color())
                .with_label(label)
        })
        .collect()
}

/// Pill board groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PillCategory {
    Frontend,
    Cloud,
    Devops,
    Data,
    Observability,
    Ai,
}

impl PillCategory {
    pub fn color(&self) -> &'static str {
        match self {
            PillCategory::Frontend => "#efcc6e",
            PillCategory::Cloud => "#c1c9ae",
            PillCategory::Devops => "#968a79",
            PillCategory::Data | PillCategory::Ai => "#b89070",
            PillCategory::Observability => "#f6f5ff",
        }
    }
}

/// Display order of the pill board
pub const PILL_ITEMS: [(&str, PillCategory); 19] = [
    ("React", PillCategory::Frontend),
    ("Next.js", PillCategory::Frontend),
    ("TypeScript", PillCategory::Frontend),
    ("React Native", PillCategory::Frontend),
    ("Expo", PillCategory::Frontend),
    ("GCP", PillCategory::Cloud),
    ("AWS", PillCategory::Cloud),
    ("Firebase", PillCategory::Cloud),
    ("Digital Ocean", PillCategory::Cloud),
    ("Docker", PillCategory::Devops),
    ("GraphQL", PillCategory::Data),
    ("Neo4j", PillCategory::Data),
    ("SQL", PillCategory::Data),
    ("MongoDB", PillCategory::Data),
    ("PostHog", PillCategory::Observability),
    ("Sentry", PillCategory::Observability),
    ("LLM APIs", PillCategory::Ai),
    ("MCP", PillCategory::Ai),
    ("etc. et al", PillCategory::Ai),
];

/// One pill on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillConfig {
    pub label: String,
    pub color: String,
    pub width: f32,
    pub height: f32,
}

/// Scale each channel of a `#rrggbb` colour by `factor` (capped at 255).
/// Unparsable input is returned unchanged.
pub fn adjust_luminance(hex: &str, factor: f32) -> String {
    let Some(n) = hex.strip_prefix('#').and_then(|h| u32::from_str_radix(h, 16).ok()) else {
        return hex.to_string();
    };
    let channel = |shift: u32| {
        let c = ((n >> shift) & 0xff) as f32;
        (c * factor).min(255.0).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", channel(16), channel(8), channel(0))
}

pub fn pill_width(label: &str) -> f32 {
    (label.chars().count() as f32 * 9.0 + PILL_PADDING_X).clamp(64.0, 180.0)
}

/// The catalogue with a 6% luminance step per item inside each category
pub fn pill_configs() -> Vec<PillConfig> {
    let mut seen: Vec<(PillCategory, u32)> = Vec::new();
    PILL_ITEMS
        .iter()
        .map(|&(label, category)| {
            let i = match seen.iter_mut().find(|(c, _)| *c == category) {
                Some((_, count)) => {
                    *count += 1;
                    *count - 1
                }
                None => {
                    seen.push((category, 1));
                    0
                }
            };
            PillConfig {
                label: label.to_string(),
                color: adjust_luminance(category.color(), 1.0 + i as f32 * 0.06),
                width: pill_width(label),
                height: PILL_HEIGHT,
            }
        })
        .collect()
}

/// Greedy rows from the top-left inset so no two pills overlap at spawn.
/// Returns pill centres.
pub fn spawn_positions(configs: &[PillConfig], board_width: f32) -> Vec<Vec2> {
    let mut positions = Vec::with_capacity(configs.len());
    let mut row_x = PILL_INSET;
    let mut row_y = PILL_INSET;
    let mut row_height: f32 = 0.0;

    for config in configs {
        if row_x + config.width > board_width - PILL_INSET && !positions.is_empty() {
            row_x = PILL_INSET;
            row_y += row_height + PILL_SPAWN_GAP;
            row_height = 0.0;
        }
        positions.push(Vec2::new(row_x + config.width / 2.0, row_y + config.height / 2.0));
        row_x += config.width + PILL_SPAWN_GAP;
        row_height = row_height.max(config.height);
    }
    positions
}

/// Reduced-motion layout: wrapped rows, each row centred, block centred
/// vertically. Returns pill centres.
pub fn static_layout(configs: &[PillConfig], board_width: f32, board_height: f32) -> Vec<Vec2> {
    let usable = (board_width - 2.0 * PILL_INSET).max(0.0);

    // (first index, end index, row width, row height)
    let mut rows: Vec<(usize, usize, f32, f32)> = Vec::new();
    let mut start = 0;
    let mut width = 0.0;
    let mut height: f32 = 0.0;
    for (i, config) in configs.iter().enumerate() {
        let next = if i == start { config.width } else { width + PILL_STATIC_GAP + config.width };
        if next > usable && i > start {
            rows.push((start, i, width, height));
            start = i;
            width = config.width;
            height = config.height;
        } else {
            width = next;
            height = height.max(config.height);
        }
    }
    if start < configs.len() {
        rows.push((start, configs.len(), width, height));
    }

    let block: f32 = rows.iter().map(|r| r.3).sum::<f32>() + PILL_STATIC_GAP * rows.len().saturating_sub(1) as f32;
    let mut y = (board_height - block) / 2.0;
    let mut positions = Vec::with_capacity(configs.len());
    for (first, end, row_width, row_height) in rows {
        let mut x = (board_width - row_width) / 2.0;
        for config in &configs[first..end] {
            positions.push(Vec2::new(x + config.width / 2.0, y + row_height / 2.0));
            x += config.width + PILL_STATIC_GAP;
        }
        y += row_height + PILL_STATIC_GAP;
    }
    positions
}

/// A board populated with `configs` at their spawn positions
pub fn pill_board(configs: &[PillConfig], width: f32, height: f32, tuning: PillTuning) -> PillBoard {
    let mut board = PillBoard::new(width, height, tuning);
    for (config, position) in configs.iter().zip(spawn_positions(configs, width)) {
        board.add_pill(position, config.width, config.height);
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_blobs_deterministic() {
        let a = header_blobs(HEADER_BLOB_COUNT, HEADER_SEED);
        let b = header_blobs(HEADER_BLOB_COUNT, HEADER_SEED);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        for (i, blob) in a.iter().enumerate() {
            assert!(blob.footprint.x >= 110.0 && blob.footprint.x < 230.0);
            assert!((blob.footprint.y - blob.footprint.x * 0.7).abs() < 1e-4);
            assert!(blob.anchor_frac.x >= 0.15 && blob.anchor_frac.x < 0.85);
            assert!(blob.anchor_frac.y >= 0.15 && blob.anchor_frac.y < 0.85);
            assert_eq!(blob.color, HEADER_PALETTE[i % 6]);
        }
        assert_ne!(header_blobs(12, 7), a);
    }

    #[test]
    fn test_tech_nodes_cluster_by_category() {
        let nodes = tech_graph_nodes(TECH_GRAPH_SEED);
        assert_eq!(nodes.len(), 14);
        for (node, (label, category)) in nodes.iter().zip(TECH_NODES) {
            assert_eq!(node.label.as_deref(), Some(label));
            assert_eq!(node.color, category.color());
            let offset = node.anchor_frac - category.center();
            assert!(offset.x.abs() <= 0.03 && offset.y.abs() <= 0.03);
        }
        assert_eq!(tech_node_size("SQL"), 92.0);
        assert_eq!(tech_node_size("Neo4j / Cypher"), 140.0);
    }

    #[test]
    fn test_adjust_luminance() {
        assert_eq!(adjust_luminance("#efcc6e", 1.0), "#efcc6e");
        assert_eq!(adjust_luminance("#808080", 1.5), "#c0c0c0");
        // Channels saturate
        assert_eq!(adjust_luminance("#f6f5ff", 1.06), "#ffffff");
        assert_eq!(adjust_luminance("teal", 1.2), "teal");
    }

    #[test]
    fn test_pill_catalogue() {
        let configs = pill_configs();
        assert_eq!(configs.len(), 19);
        assert_eq!(configs[0].color, "#efcc6e");
        assert_eq!(configs[1].color, adjust_luminance("#efcc6e", 1.06));
        // Cloud restarts its own step
        assert_eq!(configs[5].color, "#c1c9ae");
        assert_eq!(pill_width("AWS"), 64.0);
        assert_eq!(pill_width("React"), 65.0);
        assert_eq!(pill_width("Digital Ocean"), 137.0);
        assert_eq!(pill_width("a very long technology name"), 180.0);
    }

    #[test]
    fn test_spawn_positions_do_not_overlap() {
        let configs = pill_configs();
        let positions = spawn_positions(&configs, 420.0);
        assert_eq!(positions.len(), configs.len());
        assert_eq!(positions[0], Vec2::new(16.0 + configs[0].width / 2.0, 36.0));
        for i in 0..configs.len() {
            for j in (i + 1)..configs.len() {
                let dx = (positions[i].x - positions[j].x).abs();
                let dy = (positions[i].y - positions[j].y).abs();
                let separated = dx >= (configs[i].width + configs[j].width) / 2.0
                    || dy >= (configs[i].height + configs[j].height) / 2.0;
                assert!(separated, "{} overlaps {}", configs[i].label, configs[j].label);
            }
            assert!(positions[i].x + configs[i].width / 2.0 <= 420.0 - 16.0 || i == 0);
        }
    }

    #[test]
    fn test_static_layout_is_centred() {
        let configs = pill_configs();
        let positions = static_layout(&configs[..2], 400.0, 200.0);
        // Two pills fit on one row: 65 + 12 + 83
        let row = configs[0].width + PILL_STATIC_GAP + configs[1].width;
        let left = positions[0].x - configs[0].width / 2.0;
        assert!((left - (400.0 - row) / 2.0).abs() < 1e-4);
        assert_eq!(positions[0].y, 100.0);
        assert_eq!(positions[1].y, 100.0);

        let all = static_layout(&configs, 400.0, 600.0);
        assert_eq!(all.len(), configs.len());
        for (p, c) in all.iter().zip(&configs) {
            assert!(p.x - c.width / 2.0 >= 0.0 && p.x + c.width / 2.0 <= 400.0);
        }
    }

    #[test]
    fn test_pill_board_from_catalogue() {
        let configs = pill_configs();
        let board = pill_board(&configs, 600.0, 400.0, PillTuning::default());
        assert_eq!(board.len(), 19);
    }
}
