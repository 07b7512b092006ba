//! Error types for loading and running MPW tools.

use std::path::PathBuf;
use thiserror::Error;

use crate::memory::MemoryError;

/// Result type alias using the crate's fatal error type.
pub type Result<T> = std::result::Result<T, MpwError>;

/// Fatal conditions. None of these are transient; the driver reports them
/// and terminates.
#[derive(Error, Debug)]
pub enum MpwError {
    // Resource fork errors
    #[error("cannot open resource fork of {}: {source}", path.display())]
    ResourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed resource fork: {0}")]
    BadResourceFork(String),

    // Loader errors
    #[error("no CODE resources found")]
    NoCodeResources,

    #[error("no CODE 0 resource (A5 world) found")]
    MissingA5World,

    #[error("duplicate CODE 0 resource (A5 world)")]
    DuplicateA5World,

    #[error("CODE 0 resource is truncated: {0}")]
    TruncatedA5World(String),

    // Linker errors
    #[error("corrupt jump table entry at {address:#08x}: markers {marker1:#06x}/{marker2:#06x}")]
    CorruptJumpTable {
        address: u32,
        marker1: u16,
        marker2: u16,
    },

    #[error(
        "unresolved jump table entry at {address:#08x}: segment {segment} offset {offset:#06x}"
    )]
    UnresolvedSegment {
        address: u32,
        segment: u16,
        offset: u16,
    },

    // Process setup errors
    #[error("no program arguments to pass to the tool")]
    NoArguments,

    // Trap errors
    #[error("trap {trap:#06x} selector {selector:#06x} is not supported")]
    UnsupportedTrap { trap: u16, selector: u16 },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// A malformed command-line value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} - invalid input")]
    InvalidNumber(String),

    #[error("{0} - unsupported machine (expected 68000, 68010, 68020, 68030 or 68040)")]
    UnsupportedMachine(u32),

    #[error("{0} - expected KEY=VALUE")]
    InvalidEnvironment(String),
}
