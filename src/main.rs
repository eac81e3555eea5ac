use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stimgen::library::Library;
use stimgen::network::load_network;
use stimgen::pipeline::{self, PipelineConfig};
use stimgen::{DataAddressMap, TaskAddressMap};

#[derive(Parser)]
#[command(
    name = "stimgen",
    version,
    about = "Lower a layered network description into an accelerator excitation stream"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RunArgs {
    /// Network description JSON
    network: PathBuf,
    /// Op-library root (one folder per operator variant)
    op_library: PathBuf,
    /// Data-library root (weights and reference outputs)
    data_library: PathBuf,
    /// Output directory for all stage artifacts
    #[arg(long, default_value = "pipeline_output")]
    out_dir: PathBuf,
    /// Abort on a sub-task count mismatch instead of warning
    #[arg(long)]
    strict: bool,
    /// Seed for first-layer input generation (fresh entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four stages into an output directory
    Run(RunArgs),
    /// Stage 1: generate and page-align the task instruction streams
    Tasks {
        network: PathBuf,
        op_library: PathBuf,
        original_out: PathBuf,
        aligned_out: PathBuf,
    },
    /// Stage 2: synthesize the controller block and FIFO directory
    Control {
        aligned: PathBuf,
        network: PathBuf,
        combined_out: PathBuf,
        task_addresses_out: PathBuf,
        #[arg(long)]
        strict: bool,
    },
    /// Stage 3: link the data region and record data addresses
    Link {
        combined: PathBuf,
        network: PathBuf,
        data_library: PathBuf,
        full_out: PathBuf,
        data_addresses_out: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Stage 4: patch storage-controller addresses into the final stream
    Patch {
        full: PathBuf,
        task_addresses: PathBuf,
        data_addresses: PathBuf,
        final_out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Run(args) => {
            let config = PipelineConfig { strict: args.strict, seed: args.seed };
            let final_path = pipeline::run_pipeline(
                &args.network,
                &args.op_library,
                &args.data_library,
                &args.out_dir,
                config,
            )?;
            println!("final excitation stream: {}", final_path.display());
        }
        Command::Tasks { network, op_library, original_out, aligned_out } => {
            let network = load_network(&network)?;
            let library = Library::scan(&op_library)?;
            pipeline::taskgen::generate_tasks(&network, &library, &original_out, &aligned_out)?;
        }
        Command::Control { aligned, network, combined_out, task_addresses_out, strict } => {
            let network = load_network(&network)?;
            pipeline::control::generate_control(
                &aligned,
                &network,
                &combined_out,
                &task_addresses_out,
                strict,
            )?;
        }
        Command::Link { combined, network, data_library, full_out, data_addresses_out, seed } => {
            let network = load_network(&network)?;
            let library = Library::scan(&data_library)?;
            let mut rng = PipelineConfig { strict: false, seed }.rng();
            pipeline::datalink::link_data(
                &combined,
                &network,
                &library,
                &full_out,
                &data_addresses_out,
                &mut rng,
            )?;
        }
        Command::Patch { full, task_addresses, data_addresses, final_out } => {
            let task_map = TaskAddressMap::load(&task_addresses)?;
            let data_map = DataAddressMap::load(&data_addresses)?;
            pipeline::patch::patch_addresses(&full, &task_map, &data_map, &final_out)?;
        }
    }
    Ok(())
}
