//! Error types for the mapper crate.

use thiserror::Error;

/// Result type alias using the mapper's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when constructing a mapper.
///
/// Permission and ownership faults are *not* errors: they are normal
/// classifications returned by the pre-check entry point (see
/// [`AccessVerdict`](crate::AccessVerdict)) and the emulator decides how to
/// react to them.
#[derive(Error, Debug)]
pub enum Error {
    /// The wraparound mask is derived from the buffer length, so the RAM
    /// buffer must be a nonzero power of two in size.
    #[error("invalid RAM size: {0:#x} bytes (must be a nonzero power of two)")]
    InvalidRamSize(usize),

    /// The 13-bit physical page field can address at most 32 MiB; RAM beyond
    /// that would be unreachable through the table.
    #[error("RAM size {0:#x} exceeds the 32 MiB physical window")]
    RamTooLarge(usize),
}
