use std::{io, path::PathBuf};

use thiserror::Error;

/// Conditions that stop emulation.
///
/// Anything the hardware tolerates (open-bus reads, writes to read-only
/// regions, disabled cartridge RAM) is handled in place and never surfaces
/// here.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to read ROM {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM image is empty")]
    EmptyRom,

    #[error("ROM image is {len} bytes, too small to hold a cartridge header")]
    RomTooSmall { len: usize },

    #[error("illegal opcode {opcode:#04X} at {pc:#06X}; CPU locked up")]
    IllegalOpcode { opcode: u8, pc: u16 },
}

pub type Result<T> = std::result::Result<T, CoreError>;
