use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StimError {
    #[error("no library entry matches layer {layer}, sub-task {task}: {signature}")]
    LibraryMiss { layer: usize, task: usize, signature: String },
    #[error("malformed blob {path}: {reason}")]
    MalformedBlob { path: PathBuf, reason: String },
    #[error("sub-task {task} starts at address {addr}, which is not a multiple of 256")]
    AlignmentViolation { task: usize, addr: usize },
    #[error("detected {detected} sub-tasks in the stream but the network declares {expected}")]
    TaskCountMismatch { detected: usize, expected: usize },
    #[error("network description declares no layers")]
    EmptyNetwork,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StimResult<T> = Result<T, StimError>;
