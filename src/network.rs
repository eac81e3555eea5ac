use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::StimResult;

/// Output channels (Conv) or output features (FC) handled by one sub-task.
pub const SLICE_WIDTH: usize = 10;

/// One layer of the network description. The accelerator dispatches work
/// per sub-task, so the shape fields here drive both library matching and
/// sub-task slicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operator")]
pub enum NetworkLayer {
    Conv {
        #[serde(rename = "in_W")]
        in_w: usize,
        #[serde(rename = "in_H")]
        in_h: usize,
        in_channels: usize,
        #[serde(rename = "out_W")]
        out_w: usize,
        #[serde(rename = "out_H")]
        out_h: usize,
        out_channels: usize,
        kernel: (usize, usize),
        stride: usize,
        #[serde(default)]
        padding: usize,
    },
    Pool {
        #[serde(rename = "in_W")]
        in_w: usize,
        #[serde(rename = "in_H")]
        in_h: usize,
        in_channels: usize,
        #[serde(rename = "out_W")]
        out_w: usize,
        #[serde(rename = "out_H")]
        out_h: usize,
        out_channels: usize,
        kernel: (usize, usize),
        stride: usize,
    },
    #[serde(rename = "FC")]
    Fc {
        in_features: usize,
        out_features: usize,
        #[serde(rename = "isPrevFC")]
        is_prev_fc: bool,
    },
}

impl NetworkLayer {
    pub fn operator(&self) -> &'static str {
        match self {
            NetworkLayer::Conv { .. } => "Conv",
            NetworkLayer::Pool { .. } => "Pool",
            NetworkLayer::Fc { .. } => "FC",
        }
    }

    /// Number of hardware sub-tasks this layer decomposes into.
    pub fn subtask_count(&self) -> usize {
        match self {
            NetworkLayer::Conv { out_channels, .. } => out_channels.div_ceil(SLICE_WIDTH),
            NetworkLayer::Fc { out_features, .. } => out_features.div_ceil(SLICE_WIDTH),
            NetworkLayer::Pool { .. } => 1,
        }
    }

    /// Output channels (or features) covered by sub-task `k`. Pool layers
    /// carry their full channel count in their single sub-task.
    pub fn slice_width(&self, k: usize) -> usize {
        match self {
            NetworkLayer::Conv { out_channels, .. } => {
                SLICE_WIDTH.min(out_channels - SLICE_WIDTH * k)
            }
            NetworkLayer::Fc { out_features, .. } => {
                SLICE_WIDTH.min(out_features - SLICE_WIDTH * k)
            }
            NetworkLayer::Pool { out_channels, .. } => *out_channels,
        }
    }

    /// Whether the layer carries a weight blob in the data library.
    pub fn has_weights(&self) -> bool {
        matches!(self, NetworkLayer::Conv { .. } | NetworkLayer::Fc { .. })
    }

    /// Number of 128-bit input words the accelerator expects when this
    /// layer is the first of the network.
    pub fn input_lines(&self) -> usize {
        match self {
            NetworkLayer::Conv { in_w, in_h, in_channels, .. }
            | NetworkLayer::Pool { in_w, in_h, in_channels, .. } => {
                in_h.div_ceil(8) * in_w * in_channels
            }
            NetworkLayer::Fc { in_features, .. } => in_features.div_ceil(16),
        }
    }
}

/// Loads the layered network description from its JSON file.
pub fn load_network(path: &Path) -> StimResult<Vec<NetworkLayer>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Per-layer sub-task counts, in network order.
pub fn subtask_counts(network: &[NetworkLayer]) -> Vec<usize> {
    network.iter().map(NetworkLayer::subtask_count).collect()
}

/// Total sub-tasks across the network.
pub fn total_subtasks(network: &[NetworkLayer]) -> usize {
    network.iter().map(NetworkLayer::subtask_count).sum()
}
