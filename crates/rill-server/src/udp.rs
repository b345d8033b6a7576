//! UDP listener.

use crate::handler::{QueryContext, QueryHandler};
use crate::Result;
use bytes::Bytes;
use rill_proto::{Message, MAX_MESSAGE_SIZE};
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, trace};

/// UDP DNS server: one socket, one handler, one task per datagram.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    handler: Arc<dyn QueryHandler>,
    local_addr: SocketAddr,
}

impl UdpServer {
    /// Binds to `addr`. Port 0 selects an ephemeral port.
    pub async fn bind(addr: SocketAddr, handler: Arc<dyn QueryHandler>) -> Result<Self> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;
        let local_addr = socket.local_addr()?;

        info!(addr = %local_addr, "UDP server listening");

        Ok(Self {
            socket: Arc::new(socket),
            handler,
            local_addr,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves queries until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => {
                    let data = Bytes::copy_from_slice(&buf[..len]);
                    let socket = self.socket.clone();
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = process_query(socket, handler, data, src).await {
                            debug!(error = %e, client = %src, "error processing query");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "error receiving datagram");
                }
            }
        }
    }
}

async fn process_query(
    socket: Arc<UdpSocket>,
    handler: Arc<dyn QueryHandler>,
    data: Bytes,
    src: SocketAddr,
) -> Result<()> {
    // Malformed datagrams are dropped without a reply.
    let query = match Message::parse(&data) {
        Ok(msg) => msg,
        Err(e) => {
            trace!(error = %e, client = %src, "dropping unparseable datagram");
            return Ok(());
        }
    };

    let ctx = QueryContext::new(src);
    let Some(response) = handler.handle(query, ctx).await else {
        return Ok(());
    };

    socket.send_to(&response.to_wire(), src).await?;
    Ok(())
}
