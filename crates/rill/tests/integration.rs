//! Full-stack integration tests: zone loading, the UDP listener, the
//! dispatcher, authoritative answers, recursion through a scripted
//! upstream, and cache TTL behavior.

use rill_cache::RecordCache;
use rill_proto::{
    Message, Name, Question, RData, RecordType, ResourceRecord, ResponseCode, MAX_MESSAGE_SIZE,
};
use rill_resolver::{Recursor, RecursorConfig};
use rill_server::{Dispatcher, UdpServer};
use rill_zone::Zone;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const ZONE: &str = r#"
$ORIGIN foo.
$TTL 300
@       IN SOA ns.foo. admin.foo. 2024010101 7200 3600 1209600 300
@       IN NS ns.foo.
@       IN MX 20 mail.foo.
ns      IN A 10.0.0.53
www     IN A 89.2.33.1
mail    IN CNAME server.foo.
server  IN CNAME other.foo.
other   IN A 1.2.3.4
txt     IN TXT "this is text"
bar     IN NS ns.bar.foo.
ns.bar  IN A 10.0.1.53
"#;

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

/// Spawns a scripted upstream that answers every query through the given
/// responder, patching the reply id to match the query.
async fn mock_upstream<F>(responder: F) -> SocketAddr
where
    F: Fn(&Message) -> Message + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(query) = Message::parse(&buf[..len]) else {
                continue;
            };
            let mut reply = responder(&query);
            reply.set_id(query.id());
            let _ = socket.send_to(&reply.to_wire(), src).await;
        }
    });
    addr
}

/// Starts the full server stack pointed at the given upstream root.
async fn start_server(upstream: SocketAddr) -> SocketAddr {
    let zone = Zone::parse(ZONE.as_bytes()).unwrap();
    let cache = Arc::new(RecordCache::new());

    let std::net::IpAddr::V4(root_ip) = upstream.ip() else {
        unreachable!()
    };
    let recursor = Arc::new(Recursor::with_config(
        root_ip,
        cache.clone(),
        RecursorConfig {
            query_timeout: Duration::from_millis(500),
            max_depth: 16,
            upstream_port: upstream.port(),
        },
    ));

    let dispatcher = Arc::new(Dispatcher::new(&zone, cache, recursor));
    let server = UdpServer::bind("127.0.0.1:0".parse().unwrap(), dispatcher)
        .await
        .unwrap();
    let addr = server.local_addr();
    tokio::spawn(async move { server.run().await });
    addr
}

/// An upstream that denies everything.
async fn nxdomain_upstream() -> SocketAddr {
    mock_upstream(|query| {
        let mut reply = Message::response_from(query);
        reply.set_rcode(ResponseCode::NXDomain);
        reply
    })
    .await
}

async fn udp_query(server: SocketAddr, query: &Message) -> std::io::Result<Message> {
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    socket.send_to(&query.to_wire(), server).await?;

    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply"))??;

    Message::parse(&buf[..len])
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

async fn ask(server: SocketAddr, qname: &str, qtype: RecordType) -> Message {
    let query = Message::query(Question::new(name(qname), qtype));
    let reply = udp_query(server, &query).await.unwrap();
    assert_eq!(reply.id(), query.id());
    assert_eq!(reply.questions(), query.questions());
    assert!(!reply.header().is_truncated());
    reply
}

#[tokio::test]
async fn test_plain_a_with_authority() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "www.foo", RecordType::A).await;

    assert_eq!(reply.rcode(), ResponseCode::NoError);
    assert!(reply.header().is_authoritative());
    assert_eq!(reply.answers().len(), 1);
    assert_eq!(
        reply.answers()[0].rdata().as_a(),
        Some(Ipv4Addr::new(89, 2, 33, 1))
    );
    assert_eq!(reply.authority().len(), 1);
    assert_eq!(reply.authority()[0].rtype(), RecordType::NS);
    assert_eq!(reply.authority()[0].name(), &name("foo"));
}

#[tokio::test]
async fn test_cname_chain_order() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "mail.foo", RecordType::A).await;

    assert!(reply.header().is_authoritative());
    assert_eq!(reply.answers().len(), 3);

    assert_eq!(reply.answers()[0].name(), &name("mail.foo"));
    assert_eq!(
        reply.answers()[0].rdata(),
        &RData::Cname(name("server.foo"))
    );
    assert_eq!(reply.answers()[1].name(), &name("server.foo"));
    assert_eq!(reply.answers()[1].rdata(), &RData::Cname(name("other.foo")));
    assert_eq!(reply.answers()[2].name(), &name("other.foo"));
    assert_eq!(
        reply.answers()[2].rdata().as_a(),
        Some(Ipv4Addr::new(1, 2, 3, 4))
    );
}

#[tokio::test]
async fn test_in_zone_miss_is_authoritative_nxdomain() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "nxdomain-www.foo", RecordType::A).await;

    assert_eq!(reply.rcode(), ResponseCode::NXDomain);
    assert!(reply.answers().is_empty());
    assert!(reply.header().is_authoritative());
}

#[tokio::test]
async fn test_txt_stable_within_ttl() {
    let server = start_server(nxdomain_upstream().await).await;

    let first = ask(server, "txt.foo", RecordType::TXT).await;
    let second = ask(server, "txt.foo", RecordType::TXT).await;

    assert_eq!(first.answers().len(), 1);
    assert_eq!(
        first.answers()[0].rdata(),
        &RData::Txt(b"this is text".to_vec())
    );
    assert_eq!(first.answers()[0].rdata(), second.answers()[0].rdata());
    // TTL may only have counted down between the two answers.
    assert!(second.answers()[0].ttl() <= first.answers()[0].ttl());
}

#[tokio::test]
async fn test_recursive_answer_cached_until_expiry() {
    // The upstream echoes the (random) query id into the TXT rdata with a
    // short TTL, so each upstream round trip produces different rdata.
    let upstream = mock_upstream(|query| {
        let q = query.question().unwrap();
        let mut reply = Message::response_from(query);
        reply.add_answer(ResourceRecord::txt(
            q.qname.clone(),
            2,
            format!("id-{:04x}", query.id()),
        ));
        reply
    })
    .await;
    let server = start_server(upstream).await;

    let first = ask(server, "random.cache.foo", RecordType::TXT).await;
    let second = ask(server, "random.cache.foo", RecordType::TXT).await;
    assert_eq!(first.answers()[0].rdata(), second.answers()[0].rdata());

    tokio::time::sleep(Duration::from_millis(2200)).await;

    let third = ask(server, "random.cache.foo", RecordType::TXT).await;
    assert_ne!(first.answers()[0].rdata(), third.answers()[0].rdata());
}

#[tokio::test]
async fn test_delegated_child_ns_in_authority() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "bar.foo", RecordType::NS).await;

    assert!(!reply.header().is_authoritative());
    assert!(reply.answers().is_empty());
    assert_eq!(reply.authority().len(), 1);
    assert_eq!(reply.authority()[0].rtype(), RecordType::NS);
    assert_eq!(reply.authority()[0].name(), &name("bar.foo"));
    assert_eq!(reply.additional().len(), 1);
    assert_eq!(
        reply.additional()[0].rdata().as_a(),
        Some(Ipv4Addr::new(10, 0, 1, 53))
    );
}

#[tokio::test]
async fn test_apex_ns_in_answer() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "foo", RecordType::NS).await;

    assert!(reply.header().is_authoritative());
    assert_eq!(reply.answers().len(), 1);
    assert_eq!(reply.answers()[0].rdata(), &RData::Ns(name("ns.foo")));
    assert_eq!(reply.additional().len(), 1);
}

#[tokio::test]
async fn test_external_name_resolved_upstream() {
    let upstream = mock_upstream(|query| {
        let q = query.question().unwrap();
        let mut reply = Message::response_from(query);
        reply.add_answer(ResourceRecord::a(
            q.qname.clone(),
            60,
            Ipv4Addr::new(93, 184, 216, 34),
        ));
        reply
    })
    .await;
    let server = start_server(upstream).await;

    let reply = ask(server, "www.example", RecordType::A).await;
    assert_eq!(reply.rcode(), ResponseCode::NoError);
    assert!(!reply.header().is_authoritative());
    assert!(reply.header().recursion_available());
    assert_eq!(
        reply.answers()[0].rdata().as_a(),
        Some(Ipv4Addr::new(93, 184, 216, 34))
    );
}

#[tokio::test]
async fn test_mx_query() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "foo", RecordType::MX).await;

    assert!(reply.header().is_authoritative());
    assert_eq!(reply.answers().len(), 1);
    assert_eq!(
        reply.answers()[0].rdata(),
        &RData::Mx {
            preference: 20,
            exchange: name("mail.foo"),
        }
    );
}

#[tokio::test]
async fn test_upstream_silence_means_no_reply() {
    // An upstream that never answers: the whole request is dropped.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server = start_server(silent.local_addr().unwrap()).await;

    let query = Message::query(Question::a(name("dead.example")));
    assert!(udp_query(server, &query).await.is_err());
    drop(silent);
}

#[tokio::test]
async fn test_case_insensitive_lookup() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "WWW.FOO", RecordType::A).await;

    assert_eq!(reply.rcode(), ResponseCode::NoError);
    assert_eq!(reply.answers().len(), 1);
    assert!(reply.header().is_authoritative());
}

#[tokio::test]
async fn test_ttl_never_exceeds_zone_default() {
    let server = start_server(nxdomain_upstream().await).await;
    let reply = ask(server, "www.foo", RecordType::A).await;
    assert!(reply.answers()[0].ttl() <= 300);
}
