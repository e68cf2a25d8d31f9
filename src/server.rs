//! UDP server for answering fixture requests.
//!
//! Receives framed requests, computes the response body from fixtures,
//! then either drops it or schedules a delayed send back to the sender.

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::faults::{FaultInjector, Verdict};
use crate::fixtures::Fixtures;
use crate::frame::{decode_frame, empty_frame, encode_frame};
use crate::protocol::parse_request;
use crate::stats::ServerStats;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Receive buffer size (largest UDP payload)
const BUFFER_SIZE: usize = 64 * 1024;

/// A response waiting to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub frame: Bytes,
    pub peer: SocketAddr,
    pub delay: Duration,
}

/// Server instance
pub struct Server {
    socket: Arc<UdpSocket>,
    dispatcher: Dispatcher,
    faults: FaultInjector,
    rng: StdRng,
    stats: Arc<ServerStats>,
}

impl Server {
    /// Bind the socket described by `config`.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let socket = UdpSocket::from_std(create_socket(config.listen)?)?;
        info!(address = %socket.local_addr()?, "Listening");

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Server {
            socket: Arc::new(socket),
            dispatcher: Dispatcher::new(
                Fixtures::new(&config.data_dir, &config.topology),
                config.random_lookup,
            ),
            faults: config.faults(),
            rng,
            stats: Arc::new(ServerStats::default()),
        })
    }

    /// Bound address, for tests binding port 0
    #[cfg(test)]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Get the counters for testing
    #[cfg(test)]
    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Serve until Ctrl-C or a socket error.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await
    }

    /// Serve until `shutdown` completes or a socket error.
    ///
    /// A receive error is fatal: it is logged, the socket is closed and
    /// the error returned. Pending delayed sends are not drained.
    pub async fn run_until<F>(mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),

                received = self.socket.recv_from(&mut buffer) => match received {
                    Ok((len, peer)) => {
                        if let Some(reply) = self.handle_datagram(&buffer[..len], peer) {
                            self.schedule(reply);
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Server error");
                        break Err(e);
                    }
                },
            }
        };

        let stats = self.stats.snapshot();
        info!(
            received = stats.received,
            discarded = stats.discarded,
            dropped = stats.dropped,
            sent = stats.sent,
            pending = stats.pending(),
            "Socket closed"
        );
        result
    }

    /// Turn one datagram into at most one reply.
    fn handle_datagram(&mut self, datagram: &[u8], peer: SocketAddr) -> Option<Reply> {
        self.stats.record_received();
        info!(
            peer = %peer,
            raw = %String::from_utf8_lossy(datagram),
            len = datagram.len(),
            "Received message"
        );

        let payload = match decode_frame(datagram) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Discarding datagram");
                self.stats.record_discarded();
                return None;
            }
        };
        debug!(peer = %peer, payload, "Request payload");

        let command = match parse_request(payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Discarding datagram");
                self.stats.record_discarded();
                return None;
            }
        };

        let body = self.dispatcher.respond(&command, &mut self.rng);

        match self.faults.decide(&mut self.rng) {
            Verdict::Drop => {
                info!(peer = %peer, ?command, "Response DROPPED");
                self.stats.record_dropped();
                None
            }
            Verdict::Deliver(delay) => {
                debug!(
                    peer = %peer,
                    ?command,
                    delay_ms = delay.as_millis() as u64,
                    "Response scheduled"
                );
                let frame = encode_frame(&body).unwrap_or_else(|e| {
                    warn!(peer = %peer, error = %e, "Response too large, sending empty body");
                    empty_frame()
                });
                self.stats.record_scheduled();
                Some(Reply {
                    frame,
                    peer,
                    delay,
                })
            }
        }
    }

    /// Send `reply` once its delay elapses.
    fn schedule(&self, reply: Reply) {
        let socket = Arc::clone(&self.socket);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            tokio::time::sleep(reply.delay).await;

            match socket.send_to(&reply.frame, reply.peer).await {
                Ok(bytes) => {
                    stats.record_sent();
                    info!(peer = %reply.peer, bytes, "Response sent");
                }
                Err(e) => {
                    stats.record_send_failed();
                    warn!(peer = %reply.peer, error = %e, "Failed to send response");
                }
            }
        });
    }
}

/// Non-exclusive bind so several responders can share a port.
fn create_socket(addr: SocketAddr) -> io::Result<std::net::UdpSocket> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    Ok(socket.into())
}
