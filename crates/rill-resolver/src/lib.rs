//! # Rill resolution engine
//!
//! The two answer paths of the server:
//!
//! - [`Authority`] assembles authoritative answers for questions the cache
//!   can satisfy, including in-zone CNAME chains, authority NS records,
//!   and glue.
//! - [`Recursor`] walks the DNS hierarchy from a configured root,
//!   following referrals and CNAME chains, filtering every upstream reply
//!   through a bailiwick check before it reaches the shared cache.
//!
//! Both read and write one shared [`rill_cache::RecordCache`]; neither
//! keeps any other state across requests.

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use rill_proto::{Message, Question};
use std::time::Duration;
use thiserror::Error;

pub mod authority;
pub mod recursive;

pub use authority::{AuthoritativeAnswer, Authority};
pub use recursive::{Recursor, RecursorConfig, UPSTREAM_PORT};

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// An upstream did not reply within the query timeout.
    #[error("upstream query timed out")]
    Timeout,

    /// The referral chain exceeded the depth limit.
    #[error("maximum referral depth exceeded")]
    MaxDepth,

    /// Socket-level failure talking to an upstream.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// The upstream reply was unusable.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// The seam between the dispatcher and the recursion engine.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a question, returning the assembled reply.
    async fn resolve(&self, question: &Question) -> Result<Message>;
}

/// Default timeout for one upstream round trip.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on referral-chain depth.
pub const DEFAULT_MAX_DEPTH: u8 = 16;
