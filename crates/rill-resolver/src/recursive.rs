//! Iterative recursive resolution.
//!
//! The recursor walks the hierarchy from the configured root in an
//! explicit loop over a small state: the server being queried, the zone
//! that server is authoritative for, the current qname, and the depth.
//! The server's zone is the bailiwick: records outside it are dropped
//! before they can reach the cache, so a referral can only ever deposit
//! data for the subtree it was asked about.
//!
//! Each round trip uses a fresh ephemeral UDP socket with a fresh random
//! message id and a bounded read. There is no retry: a lost reply fails
//! the whole resolution.

use crate::{Resolver, ResolverError, Result, DEFAULT_MAX_DEPTH, DEFAULT_QUERY_TIMEOUT};
use async_trait::async_trait;
use rill_cache::RecordCache;
use rill_proto::{Message, Name, Question, RecordType, ResourceRecord, MAX_MESSAGE_SIZE};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Port upstream servers are queried on.
pub const UPSTREAM_PORT: u16 = 60053;

/// Configuration for the recursor.
#[derive(Debug, Clone)]
pub struct RecursorConfig {
    /// Timeout for one upstream round trip.
    pub query_timeout: Duration,
    /// Bound on referral-chain depth (CNAME restarts included).
    pub max_depth: u8,
    /// Port upstream servers listen on.
    pub upstream_port: u16,
}

impl Default for RecursorConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_depth: DEFAULT_MAX_DEPTH,
            upstream_port: UPSTREAM_PORT,
        }
    }
}

/// Iterative resolver starting from a configured root server.
pub struct Recursor {
    root: Ipv4Addr,
    cache: Arc<RecordCache>,
    config: RecursorConfig,
}

impl Recursor {
    /// Creates a recursor with default configuration.
    pub fn new(root: Ipv4Addr, cache: Arc<RecordCache>) -> Self {
        Self::with_config(root, cache, RecursorConfig::default())
    }

    /// Creates a recursor with explicit configuration.
    pub fn with_config(root: Ipv4Addr, cache: Arc<RecordCache>, config: RecursorConfig) -> Self {
        Self {
            root,
            cache,
            config,
        }
    }

    /// Resolves a question by walking the hierarchy from the root.
    pub async fn resolve(&self, question: &Question) -> Result<Message> {
        let mut server = self.root;
        let mut server_zone = Name::root();
        let mut qname = question.qname.clone();
        let mut chased: Vec<ResourceRecord> = Vec::new();
        let mut depth = 0u8;

        loop {
            if depth >= self.config.max_depth {
                return Err(ResolverError::MaxDepth);
            }
            depth += 1;

            let step = Question::new(qname.clone(), question.qtype);
            debug!(server = %server, zone = %server_zone, query = %step, depth, "upstream round trip");

            let mut reply = self.exchange(server, &step).await?;
            reply.header_mut().set_truncated(false);

            // Bailiwick: trust the server only for the zone it serves.
            let bailiwick = server_zone.clone();
            reply.retain_records(|r| {
                let keep = r.name().is_subdomain_of(&bailiwick);
                if !keep {
                    trace!(owner = %r.name(), zone = %bailiwick, "dropping out-of-bailiwick record");
                }
                keep
            });

            if reply.rcode().is_success() {
                let records: Vec<_> = reply.all_records().cloned().collect();
                self.cache.put_all(records);
            }

            // CNAME chase: restart at the root for the alias target.
            if question.qtype == RecordType::A {
                let has_a = reply
                    .answers()
                    .iter()
                    .any(|r| r.rtype() == RecordType::A && r.name() == &qname);
                let target = reply
                    .answers()
                    .iter()
                    .find(|r| r.rtype() == RecordType::CNAME && r.name() == &qname)
                    .and_then(|r| r.rdata().as_cname().cloned());
                if let (Some(target), false) = (target, has_a) {
                    trace!(qname = %qname, target = %target, "following cname");
                    chased.extend(
                        reply
                            .answers()
                            .iter()
                            .filter(|r| r.rtype() == RecordType::CNAME && r.name() == &qname)
                            .cloned(),
                    );
                    qname = target;
                    server = self.root;
                    server_zone = Name::root();
                    continue;
                }
            }

            if !reply.answers().is_empty() {
                return Ok(self.finish(question, reply, chased));
            }

            // An NS question answered by the delegation itself: done.
            if question.qtype == RecordType::NS
                && reply
                    .authority()
                    .iter()
                    .any(|r| r.rtype() == RecordType::NS && r.name() == &qname)
            {
                return Ok(self.finish(question, reply, chased));
            }

            // Referral: first NS in message order that has glue.
            let next = reply
                .authority()
                .iter()
                .filter(|r| r.rtype() == RecordType::NS)
                .find_map(|ns| {
                    let nsdname = ns.rdata().as_ns()?;
                    let glue = reply
                        .additional()
                        .iter()
                        .find(|g| g.rtype() == RecordType::A && g.name() == nsdname)?;
                    Some((glue.rdata().as_a()?, ns.name().clone()))
                });

            match next {
                Some((glue_ip, delegated_zone)) => {
                    trace!(server = %glue_ip, zone = %delegated_zone, "following referral");
                    server = glue_ip;
                    server_zone = delegated_zone;
                }
                // No answer and no usable referral: hand back what we got.
                None => return Ok(self.finish(question, reply, chased)),
            }
        }
    }

    /// Builds the final reply: chased CNAMEs first, then the last reply's
    /// sections, with AA cleared (this server is not the authority for
    /// recursive results).
    fn finish(&self, question: &Question, reply: Message, chased: Vec<ResourceRecord>) -> Message {
        let mut header = reply.header().clone();
        header.set_authoritative(false);

        let (answers, authority, additional) = reply.into_sections();
        let mut out = Message::new(header);
        out.add_question(question.clone());
        out.add_answers(chased);
        out.add_answers(answers);
        out.add_authority_records(authority);
        out.add_additional_records(additional);
        out
    }

    /// One upstream round trip on a fresh ephemeral socket.
    async fn exchange(&self, server: Ipv4Addr, question: &Question) -> Result<Message> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect((server, self.config.upstream_port)).await?;

        let query = Message::query(question.clone());
        socket.send(&query.to_wire()).await?;

        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        let len = timeout(self.config.query_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ResolverError::Timeout)??;

        let reply =
            Message::parse(&buf[..len]).map_err(|e| ResolverError::Protocol(e.to_string()))?;
        if reply.id() != query.id() {
            return Err(ResolverError::Protocol(format!(
                "reply id {:04x} does not match query id {:04x}",
                reply.id(),
                query.id()
            )));
        }
        Ok(reply)
    }
}

#[async_trait]
impl Resolver for Recursor {
    async fn resolve(&self, question: &Question) -> Result<Message> {
        Recursor::resolve(self, question).await
    }
}
