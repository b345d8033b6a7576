//! # Rill UDP server
//!
//! The external face of the resolver: a single UDP socket whose datagrams
//! are parsed, dispatched through a [`QueryHandler`], and answered. The
//! [`Dispatcher`] is the handler used in production; it classifies each
//! question, routes it to the authoritative responder or the recursor,
//! stamps the reply flags, and keeps the cache swept and the zone seeded.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod handler;
pub mod udp;

pub use dispatcher::Dispatcher;
pub use handler::{QueryContext, QueryHandler};
pub use udp::UdpServer;

use thiserror::Error;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket setup or send/receive failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
