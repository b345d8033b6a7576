//! Query handler interface.

use async_trait::async_trait;
use rill_proto::Message;
use std::net::SocketAddr;
use std::time::Instant;

/// Context for one inbound query.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext {
    /// Client address.
    pub client: SocketAddr,
    /// When the datagram was received.
    pub received_at: Instant,
}

impl QueryContext {
    /// Creates a context for a query from `client`.
    pub fn new(client: SocketAddr) -> Self {
        Self {
            client,
            received_at: Instant::now(),
        }
    }

    /// Elapsed time since the query was received.
    pub fn elapsed(&self) -> std::time::Duration {
        self.received_at.elapsed()
    }
}

/// Processes one parsed query into a reply.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Handles a query. Returning `None` drops the request without a
    /// reply (the behavior for upstream failures).
    async fn handle(&self, query: Message, context: QueryContext) -> Option<Message>;
}
