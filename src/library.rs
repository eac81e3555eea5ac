use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::StimResult;
use crate::network::NetworkLayer;

/// Instruction blob file name inside an op-library folder.
pub const OP_BLOB: &str = "op_jili.txt";
/// Weight blob file name inside a data-library folder (Conv/FC only).
pub const WEIGHT_BLOB: &str = "weight_data.txt";
/// Reference output blob file name inside a data-library folder.
pub const OUTPUT_BLOB: &str = "output_data.txt";

fn default_padding() -> Vec<usize> {
    vec![0, 0]
}

fn default_shape() -> Vec<usize> {
    vec![0, 0, 0]
}

fn default_repeate() -> usize {
    1
}

fn dim(shape: &[usize], axis: usize) -> usize {
    shape.get(axis).copied().unwrap_or(0)
}

/// The `info.json` record describing one operator variant. The same schema
/// is used by the op library (next to the instruction blob) and the data
/// library (next to the weight/output blobs, with declared line counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpInfo {
    pub operator_type: String,
    #[serde(default)]
    pub input_channels: usize,
    #[serde(default)]
    pub output_channels: usize,
    #[serde(default)]
    pub kernel_size: Vec<usize>,
    #[serde(default)]
    pub stride: Vec<usize>,
    #[serde(default = "default_padding")]
    pub padding: Vec<usize>,
    #[serde(default = "default_shape")]
    pub input_tensor_shape: Vec<usize>,
    #[serde(default = "default_shape")]
    pub output_tensor_shape: Vec<usize>,
    #[serde(default)]
    pub in_features: Vec<usize>,
    #[serde(default)]
    pub out_features: Vec<usize>,
    #[serde(rename = "isPrevFC", default)]
    pub is_prev_fc: bool,
    /// Distinguishes otherwise-identical operator folders; parsed but not
    /// consulted during matching.
    #[serde(default = "default_repeate")]
    pub repeate: usize,
    /// Declared line count of `weight_data.txt`.
    #[serde(default)]
    pub weight_data: usize,
    /// Declared line count of `output_data.txt`.
    #[serde(default)]
    pub output_data: usize,
}

impl OpInfo {
    /// Field-by-field signature match between a network layer and this
    /// entry. `width` is the output-channel (or output-feature) slice the
    /// sub-task covers; Pool layers pass their full channel count.
    pub fn matches(&self, layer: &NetworkLayer, width: usize) -> bool {
        match *layer {
            NetworkLayer::Conv {
                in_w,
                in_h,
                in_channels,
                out_w,
                out_h,
                kernel,
                stride,
                padding,
                ..
            } => {
                self.operator_type == "Conv"
                    && self.input_channels == in_channels
                    && self.kernel_size == [kernel.0, kernel.1]
                    && self.stride == [stride, stride]
                    && self.padding == [padding, padding]
                    && self.output_channels == width
                    && dim(&self.input_tensor_shape, 0) == in_w
                    && dim(&self.input_tensor_shape, 1) == in_h
                    && dim(&self.output_tensor_shape, 0) == out_w
                    && dim(&self.output_tensor_shape, 1) == out_h
            }
            NetworkLayer::Pool {
                in_w,
                in_h,
                in_channels,
                out_w,
                out_h,
                kernel,
                stride,
                ..
            } => {
                self.operator_type == "Pool"
                    && self.input_channels == in_channels
                    && self.kernel_size == [kernel.0, kernel.1]
                    && self.stride == [stride, stride]
                    && dim(&self.input_tensor_shape, 0) == in_w
                    && dim(&self.input_tensor_shape, 1) == in_h
                    && dim(&self.output_tensor_shape, 0) == out_w
                    && dim(&self.output_tensor_shape, 1) == out_h
                    && self.output_channels == width
            }
            NetworkLayer::Fc { in_features, is_prev_fc, .. } => {
                self.operator_type == "FC"
                    && self.in_features == [in_features]
                    && self.out_features == [width]
                    && self.is_prev_fc == is_prev_fc
            }
        }
    }
}

/// One operator folder: its parsed `info.json` and the folder path the
/// blob files live in.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub info: OpInfo,
    pub dir: PathBuf,
}

impl LibraryEntry {
    pub fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// An operator library: every subdirectory of the root that carries a
/// parseable `info.json`. Serves both the op library and the data library.
pub struct Library {
    entries: Vec<LibraryEntry>,
}

impl Library {
    /// Scans the library root. Folders without `info.json` are ignored;
    /// folders whose `info.json` fails to parse are skipped with a warning.
    /// Entries are ordered by folder name so matching is deterministic.
    pub fn scan(root: &Path) -> StimResult<Self> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut entries = Vec::new();
        for dir in dirs {
            let info_path = dir.join("info.json");
            if !info_path.exists() {
                continue;
            }
            let reader = match File::open(&info_path) {
                Ok(f) => BufReader::new(f),
                Err(e) => {
                    warn!(path = %info_path.display(), error = %e, "skipping unreadable library entry");
                    continue;
                }
            };
            match serde_json::from_reader::<_, OpInfo>(reader) {
                Ok(info) => entries.push(LibraryEntry { info, dir }),
                Err(e) => {
                    warn!(path = %info_path.display(), error = %e, "skipping unparseable info.json");
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose signature matches the layer at the given slice
    /// width, or None.
    pub fn find(&self, layer: &NetworkLayer, width: usize) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.info.matches(layer, width))
    }
}

/// Human-readable sub-task signature for library-miss errors.
pub fn signature(layer: &NetworkLayer, width: usize) -> String {
    format!("{} slice width {width} ({layer:?})", layer.operator())
}
