//! Error type for session creation. Every other engine operation reports
//! failure as a return value (`Option`/`bool`), per the engine's "no
//! exceptions" contract; only the constructor's "invalid argument" class of
//! failure gets a real error type.

use thiserror::Error;

/// The largest `statesize` the engine will accept, matching the original
/// engine's 16-bit size field.
pub const MAX_STATE_SIZE: usize = u16::MAX as usize;

/// The largest per-element stride (header + state, rounded to pointer
/// alignment) the position arena will accept.
pub const MAX_STRIDE: usize = u16::MAX as usize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("statesize must be in 1..=65535, got {statesize}")]
    InvalidStateSize { statesize: usize },
    #[error("cmpsize ({cmpsize}) must be in 0..=statesize ({statesize})")]
    InvalidCompareSize { cmpsize: usize, statesize: usize },
    #[error("per-element stride {stride} exceeds the 65535-byte limit")]
    StrideOverflow { stride: usize },
}
