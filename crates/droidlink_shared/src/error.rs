//! # Decode Error Types
//!
//! Everything that can be wrong with a datagram coming off the wire.

use thiserror::Error;

/// Errors produced while decoding a datagram.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The datagram is not the size its layout requires.
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Size the layout requires.
        expected: usize,
        /// Size that arrived.
        actual: usize,
    },

    /// A field holds a value its Rust representation cannot.
    #[error("format error at offset {offset}: {reason}")]
    FormatError {
        /// Byte offset of the offending field.
        offset: usize,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Command byte outside the known id space.
    #[error("unknown command id: {0}")]
    UnknownCommand(u8),
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
