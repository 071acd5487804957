use std::{io, path::PathBuf};

use thiserror::Error;

/// Top-level error type for a simulation run
#[derive(Error, Debug)]
pub enum SimError {
    #[error(
        "Number of arguments entered: {0}. Expected <capacityKB> <assoc> <blockSize> <policy>"
    )]
    Usage(usize),

    #[error("Invalid argument: {0}")]
    Args(#[from] pico_args::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open file: {}", .path.display())]
    MissingPrecondition {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Errors in the cache geometry or policy arguments
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be an integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be non-zero")]
    Zero(&'static str),

    #[error("block size {0} is not a power of two")]
    BlockSize(usize),

    #[error(
        "{capacity_kb}KB / ({assoc} ways * {block_size}B) gives {n_sets} sets, expected a non-zero power of two"
    )]
    SetCount {
        capacity_kb: usize,
        assoc: usize,
        block_size: usize,
        n_sets: usize,
    },

    #[error("cache dimensions overflow the address space")]
    Overflow,
}

/// Errors produced while reading the access trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to get instruction at line no: {line_no} for string: {line}")]
    Malformed { line_no: u64, line: String },

    #[error("Failed to read trace: {0}")]
    Io(#[from] io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
