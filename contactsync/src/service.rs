//! Serving requests from a transport.

use crate::dispatcher::Dispatcher;
use crate::transport::{IncomingPacket, PacketTransport};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Drains a transport's inbound requests through a [`Dispatcher`].
///
/// Each request runs on its own task; requests share nothing but the
/// dispatcher's handlers. A request whose handler fails is dropped without
/// a response.
#[derive(Clone)]
pub struct ContactsService {
    dispatcher: Arc<Dispatcher>,
}

impl ContactsService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serves requests until the transport shuts down, then waits for the
    /// requests still in flight.
    pub async fn run<T: PacketTransport + 'static>(&self, transport: Arc<T>) {
        let mut in_flight = JoinSet::new();

        while let Some(incoming) = transport.recv_request().await {
            let dispatcher = self.dispatcher.clone();
            let transport = transport.clone();
            in_flight.spawn(async move {
                let IncomingPacket {
                    packet,
                    response_token,
                } = incoming;
                match dispatcher.dispatch(&packet).await {
                    Ok(response) => {
                        debug!("Answering {} with {}", packet.packet_type, response.packet_type);
                        if let Err(e) = transport.send_response(response_token, response).await {
                            warn!("Failed to answer {}: {}", packet.packet_type, e);
                        }
                    }
                    Err(e) => warn!("Dropping {} request: {}", packet.packet_type, e),
                }
            });
            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    warn!("Request task failed: {}", e);
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                warn!("Request task failed: {}", e);
            }
        }
        info!("Transport closed, contacts service stopped");
    }
}
