//! Request dispatcher.
//!
//! Classifies each inbound question and routes it: questions the cache
//! can satisfy go to the authoritative responder, everything else goes to
//! the recursor starting at the root. The dispatcher owns the reply
//! header: id and question echo, RA, the AA computation, and the
//! always-cleared TC. It also keeps the cache swept and re-seeds zone
//! data whose cache entries have drained.

use crate::handler::{QueryContext, QueryHandler};
use async_trait::async_trait;
use rill_cache::{CacheKey, RecordCache};
use rill_proto::{Message, Name, Question, RecordType, ResourceRecord, ResponseCode};
use rill_resolver::{Authority, Resolver};
use rill_zone::Zone;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The production query handler.
pub struct Dispatcher {
    cache: Arc<RecordCache>,
    authority: Authority,
    resolver: Arc<dyn Resolver>,
    /// Zone records grouped by key, TTL already set to the zone default,
    /// for seeding and re-seeding the cache.
    seed_groups: HashMap<CacheKey, Vec<ResourceRecord>>,
}

impl Dispatcher {
    /// Creates a dispatcher and seeds the cache from the zone.
    pub fn new(zone: &Zone, cache: Arc<RecordCache>, resolver: Arc<dyn Resolver>) -> Self {
        let mut seed_groups: HashMap<CacheKey, Vec<ResourceRecord>> = HashMap::new();
        for record in zone.records() {
            let seeded = record.with_ttl(zone.default_ttl());
            seed_groups
                .entry(CacheKey::new(seeded.name(), seeded.rtype()))
                .or_default()
                .push(seeded);
        }

        let dispatcher = Self {
            cache: cache.clone(),
            authority: Authority::new(zone.origin().clone(), cache),
            resolver,
            seed_groups,
        };
        dispatcher.reseed();
        dispatcher
    }

    /// Returns the served origin.
    pub fn origin(&self) -> &Name {
        self.authority.origin()
    }

    /// Sweeps the cache, then restores any zone record group whose key
    /// has drained. Seeding only drained keys preserves the multiset: a
    /// group is either fully present or fully re-inserted.
    pub fn sweep(&self) {
        self.cache.sweep();
        self.reseed();
    }

    fn reseed(&self) {
        for (key, records) in &self.seed_groups {
            if !self.cache.contains(key.name(), key.rtype()) {
                self.cache.put_all(records.iter().cloned());
            }
        }
    }

    /// A question goes to the authoritative responder when the cache can
    /// speak to it: entries under `(qname, qtype)`, or under
    /// `(qname, CNAME)` for address queries.
    fn is_cached(&self, question: &Question) -> bool {
        self.cache.contains(&question.qname, question.qtype)
            || (question.qtype == RecordType::A
                && self.cache.contains(&question.qname, RecordType::CNAME))
    }

    /// The trailing CNAME of an answer chain whose target has no A record
    /// in the chain, if any.
    fn unterminated_cname(answers: &[ResourceRecord]) -> Option<Name> {
        let last = answers
            .iter()
            .rev()
            .find(|r| r.rtype() == RecordType::CNAME)?;
        let target = last.rdata().as_cname()?.clone();
        let terminated = answers
            .iter()
            .any(|r| r.rtype() == RecordType::A && r.name() == &target);
        (!terminated).then_some(target)
    }
}

#[async_trait]
impl QueryHandler for Dispatcher {
    async fn handle(&self, query: Message, ctx: QueryContext) -> Option<Message> {
        self.sweep();

        let mut resp = Message::response_from(&query);
        resp.header_mut().set_recursion_available(true);

        let Some(question) = query.question().cloned() else {
            resp.set_rcode(ResponseCode::FormErr);
            return Some(resp);
        };

        if self.is_cached(&question) {
            let mut out = self.authority.answer(&question);

            // A chain ending at an out-of-zone alias target is chased
            // through the recursor.
            if question.qtype == RecordType::A && out.rcode.is_success() {
                if let Some(target) = Self::unterminated_cname(&out.answers) {
                    if !self.authority.in_zone(&target) {
                        match self.resolver.resolve(&Question::a(target.clone())).await {
                            Ok(chased) => {
                                let (answers, _, _) = chased.into_sections();
                                out.answers.extend(answers);
                            }
                            Err(e) => {
                                warn!(error = %e, target = %target, "cname chase failed, dropping query");
                                return None;
                            }
                        }
                    }
                }
            }

            resp.set_rcode(out.rcode);
            resp.add_answers(out.answers);
            resp.add_authority_records(out.authority);
            resp.add_additional_records(out.additional);
        } else {
            match self.resolver.resolve(&question).await {
                Ok(result) => {
                    resp.set_rcode(result.rcode());
                    let (answers, authority, additional) = result.into_sections();
                    resp.add_answers(answers);
                    resp.add_authority_records(authority);
                    resp.add_additional_records(additional);
                }
                Err(e) => {
                    warn!(error = %e, question = %question, "resolution failed, dropping query");
                    return None;
                }
            }
        }

        // AA: a non-empty answer wholly inside the served zone, or an
        // authoritative denial for an in-zone name.
        let in_zone = |name: &Name| self.authority.in_zone(name);
        let aa = (!resp.answers().is_empty() && resp.answers().iter().all(|r| in_zone(r.name())))
            || (resp.rcode().is_nxdomain() && in_zone(&question.qname));
        resp.header_mut().set_authoritative(aa);
        resp.header_mut().set_truncated(false);
        resp.set_id(query.id());

        debug!(
            client = %ctx.client,
            question = %question,
            rcode = %resp.rcode(),
            answers = resp.answers().len(),
            latency_us = ctx.elapsed().as_micros() as u64,
            "query answered"
        );
        Some(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_resolver::{ResolverError, Result as ResolverResult};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    const ZONE: &str = r#"
$ORIGIN foo.
$TTL 300
@       IN SOA ns.foo. admin.foo. 1 7200 3600 1209600 300
@       IN NS ns.foo.
@       IN MX 20 mail.foo.
ns      IN A 10.0.0.53
www     IN A 89.2.33.1
mail    IN CNAME server.foo.
server  IN CNAME other.foo.
other   IN A 1.2.3.4
txt     IN TXT "this is text"
ext     IN CNAME real.example.
bar     IN NS ns.bar.foo.
ns.bar  IN A 10.0.1.53
"#;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    /// Scripted stand-in for the recursor.
    struct ScriptedResolver {
        answers: Vec<ResourceRecord>,
        fail: bool,
    }

    impl ScriptedResolver {
        fn answering(answers: Vec<ResourceRecord>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answers: Vec::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        async fn resolve(&self, question: &Question) -> ResolverResult<Message> {
            if self.fail {
                return Err(ResolverError::Timeout);
            }
            let mut reply = Message::query(question.clone());
            reply.header_mut().flags = rill_proto::HeaderFlags::QR;
            for record in &self.answers {
                reply.add_answer(record.clone());
            }
            if self.answers.is_empty() {
                reply.set_rcode(ResponseCode::NXDomain);
            }
            Ok(reply)
        }
    }

    fn dispatcher(resolver: Arc<dyn Resolver>) -> (Dispatcher, Arc<RecordCache>) {
        let zone = Zone::parse(ZONE.as_bytes()).unwrap();
        let cache = Arc::new(RecordCache::new());
        (Dispatcher::new(&zone, cache.clone(), resolver), cache)
    }

    fn ctx() -> QueryContext {
        QueryContext::new("127.0.0.1:55000".parse().unwrap())
    }

    async fn ask(d: &Dispatcher, qname: &str, qtype: RecordType) -> Message {
        let query = Message::query(Question::new(name(qname), qtype));
        d.handle(query, ctx()).await.expect("expected a reply")
    }

    #[tokio::test]
    async fn test_plain_a_is_authoritative() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let resp = ask(&d, "www.foo", RecordType::A).await;

        assert_eq!(resp.rcode(), ResponseCode::NoError);
        assert!(resp.header().is_authoritative());
        assert!(resp.header().recursion_available());
        assert_eq!(resp.answers().len(), 1);
        assert_eq!(
            resp.answers()[0].rdata().as_a(),
            Some(Ipv4Addr::new(89, 2, 33, 1))
        );
        assert_eq!(resp.authority().len(), 1);
        assert_eq!(resp.authority()[0].rtype(), RecordType::NS);
    }

    #[tokio::test]
    async fn test_in_zone_cname_chain() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let resp = ask(&d, "mail.foo", RecordType::A).await;

        let kinds: Vec<_> = resp.answers().iter().map(|r| r.rtype()).collect();
        assert_eq!(
            kinds,
            vec![RecordType::CNAME, RecordType::CNAME, RecordType::A]
        );
        assert!(resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_out_of_zone_cname_is_chased() {
        let chased = ScriptedResolver::answering(vec![ResourceRecord::a(
            name("real.example"),
            60,
            Ipv4Addr::new(9, 9, 9, 9),
        )]);
        let (d, _) = dispatcher(chased);
        let resp = ask(&d, "ext.foo", RecordType::A).await;

        assert_eq!(resp.answers().len(), 2);
        assert_eq!(resp.answers()[0].rtype(), RecordType::CNAME);
        assert_eq!(
            resp.answers()[1].rdata().as_a(),
            Some(Ipv4Addr::new(9, 9, 9, 9))
        );
        // Terminal A is outside the zone.
        assert!(!resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_uncached_question_recurses() {
        let external = ScriptedResolver::answering(vec![ResourceRecord::a(
            name("www.elsewhere"),
            60,
            Ipv4Addr::new(4, 4, 4, 4),
        )]);
        let (d, cache) = dispatcher(external);
        let resp = ask(&d, "www.elsewhere", RecordType::A).await;

        assert_eq!(resp.answers().len(), 1);
        assert!(!resp.header().is_authoritative());
        assert!(resp.header().recursion_available());
        drop(cache);
    }

    #[tokio::test]
    async fn test_in_zone_miss_recurses_then_denies() {
        // Nothing cached for the name, so the dispatcher recurses; the
        // upstream denies; the denial is stamped authoritative because the
        // name is in-zone.
        let (d, _) = dispatcher(ScriptedResolver::answering(Vec::new()));
        let resp = ask(&d, "nxdomain-www.foo", RecordType::A).await;

        assert_eq!(resp.rcode(), ResponseCode::NXDomain);
        assert!(resp.answers().is_empty());
        assert!(resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_delegation_is_not_authoritative() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let resp = ask(&d, "bar.foo", RecordType::NS).await;

        assert!(resp.answers().is_empty());
        assert_eq!(resp.authority().len(), 1);
        assert_eq!(resp.additional().len(), 1);
        assert!(!resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_apex_ns_is_authoritative() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let resp = ask(&d, "foo", RecordType::NS).await;

        assert_eq!(resp.answers().len(), 1);
        assert!(resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_resolver_failure_drops_query() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let query = Message::query(Question::a(name("www.elsewhere")));
        assert!(d.handle(query, ctx()).await.is_none());
    }

    #[tokio::test]
    async fn test_no_question_is_formerr() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let query = Message::default();
        let resp = d.handle(query, ctx()).await.unwrap();
        assert_eq!(resp.rcode(), ResponseCode::FormErr);
    }

    #[tokio::test]
    async fn test_reply_id_and_question_echo() {
        let (d, _) = dispatcher(ScriptedResolver::failing());
        let mut query = Message::query(Question::a(name("www.foo")));
        query.set_id(0xBEEF);
        let resp = d.handle(query.clone(), ctx()).await.unwrap();

        assert_eq!(resp.id(), 0xBEEF);
        assert_eq!(resp.questions(), query.questions());
        assert!(!resp.header().is_truncated());
    }

    #[tokio::test]
    async fn test_drained_zone_data_is_reseeded() {
        let (d, cache) = dispatcher(ScriptedResolver::failing());
        cache.clear();

        let resp = ask(&d, "www.foo", RecordType::A).await;
        assert_eq!(resp.answers().len(), 1);
        assert!(resp.header().is_authoritative());
    }

    #[tokio::test]
    async fn test_cached_external_answer_served_from_cache() {
        let (d, cache) = dispatcher(ScriptedResolver::failing());
        cache.put(ResourceRecord::txt(name("cached.elsewhere"), 60, "hello"));

        let resp = ask(&d, "cached.elsewhere", RecordType::TXT).await;
        assert_eq!(resp.answers().len(), 1);
        assert!(!resp.header().is_authoritative());
        assert!(resp.authority().is_empty());
    }
}
