//! # Link Error Types
//!
//! Nothing here is fatal to the tick loop: per-datagram failures are
//! counted and reported, never propagated out of [`crate::LinkController::tick`].

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur on the ground-station link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The telemetry socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// An outbound command datagram could not be sent.
    ///
    /// The frame is discarded, not re-queued.
    #[error("failed to send to {addr}: {source}")]
    Send {
        /// Destination of the datagram.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// No droid is selected and broadcast is off.
    #[error("no target selected")]
    NoTarget,

    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Any other socket or file error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
