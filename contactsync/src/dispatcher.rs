//! Routing inbound packets to their handlers.

use crate::error::{SyncError, SyncResult};
use crate::protocol::Packet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handles one family of packet types.
///
/// A successful call yields exactly one response packet. An error means no
/// response is sent for that request.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    /// Packet types this handler accepts.
    fn supported_packet_types(&self) -> &'static [&'static str];

    /// Packet types this handler may answer with.
    fn outgoing_packet_types(&self) -> &'static [&'static str];

    async fn on_packet(&self, packet: &Packet) -> SyncResult<Packet>;
}

/// Fixed mapping from packet type to handler.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<&'static str, Arc<dyn PacketHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for each of its supported packet types.
    pub fn register(&mut self, handler: Arc<dyn PacketHandler>) {
        for &packet_type in handler.supported_packet_types() {
            if self.handlers.insert(packet_type, handler.clone()).is_some() {
                warn!("Replacing handler for {}", packet_type);
            }
        }
    }

    /// Builder form of [`Dispatcher::register`].
    pub fn with_handler(mut self, handler: Arc<dyn PacketHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn handles(&self, packet_type: &str) -> bool {
        self.handlers.contains_key(packet_type)
    }

    /// Every packet type with a registered handler, sorted.
    pub fn packet_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Routes `packet` to its handler.
    pub async fn dispatch(&self, packet: &Packet) -> SyncResult<Packet> {
        let Some(handler) = self.handlers.get(packet.packet_type.as_str()) else {
            warn!("No handler for packet type {}", packet.packet_type);
            return Err(SyncError::UnsupportedMessageType(packet.packet_type.clone()));
        };
        debug!("Dispatching {} (id {})", packet.packet_type, packet.id);
        handler.on_packet(packet).await
    }
}
