//! `MapcastServer` builder and accept loop.
//!
//! This is the entry point for running the real-time side of the map
//! editor. It ties together all the layers:
//! transport → protocol → session, with the event bus feeding the
//! broadcast dispatcher.

use std::sync::Arc;

use mapcast_events::{DomainEvent, EventBus, EventError, EventKind};
use mapcast_protocol::{Codec, PipeCodec};
use mapcast_session::{HandshakeHandler, IdentityStore, SessionRegistry};
use mapcast_transport::{Transport, WebSocketTransport};

use crate::dispatcher::BroadcastDispatcher;
use crate::handler::handle_connection;
use crate::MapcastError;

/// Default listen address, matching the HTTP API's default port.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The only
/// mutable part is the registry, which synchronizes itself.
pub(crate) struct ServerState<S: IdentityStore, C: Codec> {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) handshake: HandshakeHandler<S>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Mapcast server.
///
/// # Example
///
/// ```rust,ignore
/// use mapcast::prelude::*;
///
/// let store = Arc::new(MemoryIdentityStore::new());
/// let server = MapcastServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .build(store)
///     .await?;
/// let events = server.publisher();
/// tokio::spawn(server.run());
/// events.publish(DomainEvent::MarkerRemoved { id: "m1".into() });
/// ```
pub struct MapcastServerBuilder {
    bind_addr: String,
    bus: EventBus,
}

impl MapcastServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bus: EventBus::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Registers an extra event subscriber. It runs after the broadcast
    /// dispatcher for the same event.
    pub fn subscribe<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&DomainEvent) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler);
        self
    }

    /// Binds the transport and wires registry, handshake, dispatcher and
    /// bus together. Uses `PipeCodec` and `WebSocketTransport`.
    pub async fn build<S: IdentityStore>(
        self,
        store: Arc<S>,
    ) -> Result<MapcastServer<S, PipeCodec>, MapcastError> {
        self.build_with_codec(store, PipeCodec).await
    }

    /// Like [`build`](Self::build) with a caller-supplied codec.
    pub async fn build_with_codec<S, C>(
        self,
        store: Arc<S>,
        codec: C,
    ) -> Result<MapcastServer<S, C>, MapcastError>
    where
        S: IdentityStore,
        C: Codec + Clone,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let registry = Arc::new(SessionRegistry::new());

        // The dispatcher must be the first subscriber for every kind; extra
        // subscribers added on the builder are re-registered after it.
        let mut bus = EventBus::new();
        Arc::new(BroadcastDispatcher::new(Arc::clone(&registry), codec.clone()))
            .install(&mut bus);
        bus.extend(self.bus);

        let state = Arc::new(ServerState {
            registry: Arc::clone(&registry),
            handshake: HandshakeHandler::new(registry, store),
            codec,
        });

        Ok(MapcastServer {
            transport,
            state,
            bus: Arc::new(bus),
        })
    }
}

impl Default for MapcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Mapcast server.
///
/// Grab [`publisher()`](Self::publisher) before calling
/// [`run()`](Self::run), which consumes the server.
pub struct MapcastServer<S: IdentityStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
    bus: Arc<EventBus>,
}

impl<S, C> MapcastServer<S, C>
where
    S: IdentityStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The publish point for CRUD handlers. Publishing never fails.
    pub fn publisher(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// The live session registry.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop, spawning one handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), MapcastError> {
        tracing::info!("Mapcast server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection::<S, C>(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
