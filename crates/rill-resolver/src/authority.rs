//! Authoritative answer assembly.
//!
//! Answers are assembled from the shared cache, which the served zone was
//! seeded into at startup. The responder fills the three record sections
//! and picks the rcode; the dispatcher owns the header flags.

use rill_cache::RecordCache;
use rill_proto::{Name, Question, RecordType, ResourceRecord, ResponseCode};
use std::sync::Arc;
use tracing::trace;

/// Bound on in-zone CNAME chain length.
const MAX_CNAME_CHAIN: usize = 8;

/// The record sections and rcode of an authoritative answer.
#[derive(Debug, Default)]
pub struct AuthoritativeAnswer {
    /// Answer section.
    pub answers: Vec<ResourceRecord>,
    /// Authority section.
    pub authority: Vec<ResourceRecord>,
    /// Additional section (glue).
    pub additional: Vec<ResourceRecord>,
    /// Response code.
    pub rcode: ResponseCode,
}

/// Authoritative responder for the served zone.
pub struct Authority {
    origin: Name,
    cache: Arc<RecordCache>,
}

impl Authority {
    /// Creates a responder for the zone rooted at `origin`.
    pub fn new(origin: Name, cache: Arc<RecordCache>) -> Self {
        Self { origin, cache }
    }

    /// Returns the served origin.
    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// Returns true if `name` lies inside the served zone.
    pub fn in_zone(&self, name: &Name) -> bool {
        name.is_subdomain_of(&self.origin)
    }

    /// Answers a question from the cache.
    pub fn answer(&self, question: &Question) -> AuthoritativeAnswer {
        let mut out = AuthoritativeAnswer::default();
        let qname = &question.qname;

        match question.qtype {
            RecordType::A => {
                let cnames = self.cache.get(qname, RecordType::CNAME);
                if !cnames.is_empty() {
                    for cname in &cnames {
                        out.answers.push(cname.clone());
                        if let Some(target) = cname.rdata().as_cname() {
                            if self.in_zone(target) {
                                self.chase_a(target, &mut out, 1);
                            }
                        }
                    }
                    self.attach_authority(qname, &mut out);
                } else {
                    let addresses = self.cache.get(qname, RecordType::A);
                    if addresses.is_empty() {
                        out.rcode = ResponseCode::NXDomain;
                        return out;
                    }
                    out.answers.extend(addresses);
                    self.attach_authority(qname, &mut out);
                }
            }
            RecordType::NS => {
                let servers = self.cache.get(qname, RecordType::NS);
                if servers.is_empty() {
                    out.rcode = ResponseCode::NXDomain;
                    return out;
                }
                // Apex NS answers authoritatively; anything else is a
                // delegation point and goes in the authority section.
                let at_apex = qname == &self.origin;
                for ns in &servers {
                    if let Some(target) = ns.rdata().as_ns() {
                        out.additional.extend(self.cache.get(target, RecordType::A));
                    }
                }
                if at_apex {
                    out.answers = servers;
                } else {
                    trace!(qname = %qname, "delegation point");
                    out.authority = servers;
                }
            }
            qtype => {
                // MX, TXT, CNAME, and every transparently cached type share
                // one shape: matching entries or NXDOMAIN.
                let records = self.cache.get(qname, qtype);
                if records.is_empty() {
                    out.rcode = ResponseCode::NXDomain;
                    return out;
                }
                out.answers.extend(records);
                self.attach_authority(qname, &mut out);
            }
        }

        out
    }

    /// Follows an in-zone CNAME chain for an A query, appending each link
    /// and the terminal A records.
    fn chase_a(&self, target: &Name, out: &mut AuthoritativeAnswer, depth: usize) {
        if depth > MAX_CNAME_CHAIN {
            trace!(target = %target, "cname chain too long, stopping");
            return;
        }
        let cnames = self.cache.get(target, RecordType::CNAME);
        if cnames.is_empty() {
            out.answers.extend(self.cache.get(target, RecordType::A));
            return;
        }
        for cname in cnames {
            let next = cname.rdata().as_cname().cloned();
            out.answers.push(cname);
            if let Some(next) = next {
                if self.in_zone(&next) {
                    self.chase_a(&next, out, depth + 1);
                }
            }
        }
    }

    /// Appends the cached apex NS set to the authority section for
    /// answers whose owner is in-zone.
    fn attach_authority(&self, qname: &Name, out: &mut AuthoritativeAnswer) {
        if self.in_zone(qname) {
            out.authority
                .extend(self.cache.get(&self.origin, RecordType::NS));
        }
    }
}
