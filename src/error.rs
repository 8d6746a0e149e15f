//! Typed error taxonomy for the MSP430 core.
//!
//! Every fallible operation in this crate returns a [`Result<T>`] rather than
//! panicking on architecturally-reachable input. The four variants here match
//! the error taxonomy the engine is required to surface: a decoder or jump
//! constructor can fail with [`EmulatorError::InvalidInstruction`], and the
//! memory view can fail with the other three depending on which access
//! pattern triggered it.

use thiserror::Error;

/// The result type used throughout the core.
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Conditions the core reports to its caller.
///
/// A failing decode or execute leaves register, memory, and flag state
/// unchanged, with one documented exception: indirect-autoincrement commits
/// its source-register mutation before later phases run, so a failure in a
/// later phase does not roll back that increment. This matches what the
/// hardware itself does.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorError {
    /// An undefined opcode, a reserved encoding, or a jump offset outside
    /// -511..=512 words.
    #[error("invalid instruction: opcode {opcode:#06x} ({detail})")]
    InvalidInstruction {
        /// The offending instruction word.
        opcode: u16,
        /// A short, human-readable reason (e.g. "jump offset out of range").
        detail: &'static str,
    },

    /// A read or write to an address outside the 64 KiB address space.
    #[error("memory access out of bounds at {addr:#06x} ({kind})")]
    MemoryAccessError {
        /// The address that was accessed.
        addr: u32,
        /// Whether this was a read or a write.
        kind: AccessKind,
    },

    /// PUSH/CALL decremented SP past the bottom of the address space.
    #[error("stack overflow: SP would become {sp:#06x}")]
    StackOverflow {
        /// The stack pointer value that would have resulted.
        sp: i32,
    },

    /// POP/RETI incremented SP past the top of the address space.
    #[error("stack underflow: SP would become {sp:#06x}")]
    StackUnderflow {
        /// The stack pointer value that would have resulted.
        sp: u32,
    },
}

/// Whether a memory fault occurred on a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// The fault occurred during a read.
    Read,
    /// The fault occurred during a write.
    Write,
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}
