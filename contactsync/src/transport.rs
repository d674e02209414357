//! Transport layer abstraction.
//!
//! Pairing, encryption, framing and timeouts belong to the transport. The
//! sync layer only sends a request and waits for its response, or receives
//! requests and answers each through its [`ResponseToken`].

use crate::error::SyncResult;
use crate::protocol::Packet;
use async_trait::async_trait;
use std::any::Any;

/// Opaque token used to send a response back to an incoming request.
/// Each transport implementation wraps its own channel type inside this.
pub struct ResponseToken(Box<dyn Any + Send>);

impl ResponseToken {
    /// Wraps a transport-specific response channel.
    pub fn new<T: Any + Send + 'static>(inner: T) -> Self {
        Self(Box::new(inner))
    }

    /// Unwraps back to the transport-specific type.
    pub fn downcast<T: Any + Send + 'static>(self) -> Option<T> {
        self.0.downcast::<T>().ok().map(|b| *b)
    }
}

/// A request received by the transport.
pub struct IncomingPacket {
    /// The request packet.
    pub packet: Packet,
    /// Opaque token to send the response back through. Dropping it
    /// without answering leaves the request unanswered.
    pub response_token: ResponseToken,
}

/// A packet transport to one paired device.
#[async_trait]
pub trait PacketTransport: Send + Sync {
    /// Sends a request and waits for the response.
    async fn send_request(&self, packet: Packet) -> SyncResult<Packet>;

    /// Receives the next incoming request.
    /// Returns `None` if the transport is shutting down.
    async fn recv_request(&self) -> Option<IncomingPacket>;

    /// Sends the response to a previously received request.
    async fn send_response(&self, token: ResponseToken, packet: Packet) -> SyncResult<()>;
}

/// An in-process transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use tokio::sync::{mpsc, oneshot, Mutex};
    use tracing::warn;

    /// Requests travel as serialized lines, as they would on a socket.
    type Envelope = (String, oneshot::Sender<String>);

    /// One end of a connected pair of mock transports.
    pub struct MockTransport {
        outgoing: mpsc::Sender<Envelope>,
        incoming: Mutex<mpsc::Receiver<Envelope>>,
    }

    impl MockTransport {
        /// Creates two connected transports. Requests sent on one are
        /// received on the other.
        pub fn pair() -> (Self, Self) {
            let (a_tx, a_rx) = mpsc::channel(32);
            let (b_tx, b_rx) = mpsc::channel(32);
            (
                Self {
                    outgoing: a_tx,
                    incoming: Mutex::new(b_rx),
                },
                Self {
                    outgoing: b_tx,
                    incoming: Mutex::new(a_rx),
                },
            )
        }
    }

    #[async_trait]
    impl PacketTransport for MockTransport {
        async fn send_request(&self, packet: Packet) -> SyncResult<Packet> {
            let (tx, rx) = oneshot::channel();
            self.outgoing
                .send((packet.serialize()?, tx))
                .await
                .map_err(|_| SyncError::ChannelClosed)?;
            let line = rx
                .await
                .map_err(|_| SyncError::NoResponse(packet.packet_type.clone()))?;
            Packet::deserialize(&line)
        }

        async fn recv_request(&self) -> Option<IncomingPacket> {
            let mut incoming = self.incoming.lock().await;
            loop {
                let (line, reply) = incoming.recv().await?;
                match Packet::deserialize(&line) {
                    Ok(packet) => {
                        return Some(IncomingPacket {
                            packet,
                            response_token: ResponseToken::new(reply),
                        });
                    }
                    Err(e) => warn!("Discarding undecodable packet: {}", e),
                }
            }
        }

        async fn send_response(&self, token: ResponseToken, packet: Packet) -> SyncResult<()> {
            let reply = token
                .downcast::<oneshot::Sender<String>>()
                .ok_or_else(|| SyncError::Protocol("response token from another transport".into()))?;
            reply
                .send(packet.serialize()?)
                .map_err(|_| SyncError::ChannelClosed)
        }
    }
}
