pub mod boundary;
pub mod control;
pub mod datalink;
pub mod patch;
pub mod taskgen;

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::errors::StimResult;
use crate::library::Library;
use crate::network::load_network;

pub const ORIGINAL_TASKS_FILE: &str = "1_original_tasks.txt";
pub const ALIGNED_TASKS_FILE: &str = "1_aligned_tasks.txt";
pub const CONTROL_AND_TASKS_FILE: &str = "2_control_and_tasks.txt";
pub const TASK_ADDRESSES_FILE: &str = "task_addresses.json";
pub const FULL_CONFIG_FILE: &str = "3_full_config_with_data.txt";
pub const DATA_ADDRESSES_FILE: &str = "data_addresses.json";
pub const FINAL_CONFIG_FILE: &str = "final_executable_config.txt";

/// Knobs for a pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    /// Abort when the stream holds more sub-tasks than the network
    /// declares, instead of parking the excess under an overflow layer.
    pub strict: bool,
    /// Seed for first-layer input generation. Fresh entropy when None.
    pub seed: Option<u64>,
}

impl PipelineConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Fixed artifact names inside one output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn original_tasks(&self) -> PathBuf {
        self.dir.join(ORIGINAL_TASKS_FILE)
    }

    pub fn aligned_tasks(&self) -> PathBuf {
        self.dir.join(ALIGNED_TASKS_FILE)
    }

    pub fn control_and_tasks(&self) -> PathBuf {
        self.dir.join(CONTROL_AND_TASKS_FILE)
    }

    pub fn task_addresses(&self) -> PathBuf {
        self.dir.join(TASK_ADDRESSES_FILE)
    }

    pub fn full_config(&self) -> PathBuf {
        self.dir.join(FULL_CONFIG_FILE)
    }

    pub fn data_addresses(&self) -> PathBuf {
        self.dir.join(DATA_ADDRESSES_FILE)
    }

    pub fn final_config(&self) -> PathBuf {
        self.dir.join(FINAL_CONFIG_FILE)
    }
}

/// Runs the whole four-stage lowering: task generation and alignment,
/// controller synthesis, data linking, address patching. Returns the path
/// of the final executable stream.
pub fn run_pipeline(
    network_path: &Path,
    op_library_root: &Path,
    data_library_root: &Path,
    out_dir: &Path,
    config: PipelineConfig,
) -> StimResult<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let layout = OutputLayout::new(out_dir);

    let network = load_network(network_path)?;
    let op_library = Library::scan(op_library_root)?;
    info!(layers = network.len(), operators = op_library.len(), "pipeline start");

    taskgen::generate_tasks(
        &network,
        &op_library,
        &layout.original_tasks(),
        &layout.aligned_tasks(),
    )?;

    let task_map = control::generate_control(
        &layout.aligned_tasks(),
        &network,
        &layout.control_and_tasks(),
        &layout.task_addresses(),
        config.strict,
    )?;

    let data_library = Library::scan(data_library_root)?;
    let mut rng = config.rng();
    let data_map = datalink::link_data(
        &layout.control_and_tasks(),
        &network,
        &data_library,
        &layout.full_config(),
        &layout.data_addresses(),
        &mut rng,
    )?;

    patch::patch_addresses(
        &layout.full_config(),
        &task_map,
        &data_map,
        &layout.final_config(),
    )?;

    let final_path = layout.final_config();
    info!(path = %final_path.display(), "pipeline complete");
    Ok(final_path)
}
