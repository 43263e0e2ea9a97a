//! Per-connection handler: register, read frames, write broadcasts, close.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an anonymous session with an outbound queue
//!   2. Spawn a writer task draining that queue onto the socket
//!   3. Loop: receive frames → AUTH goes to the handshake, anything else
//!      is dropped
//!   4. On close: presence offline (if bound), unregister, stop the writer

use std::sync::Arc;

use mapcast_protocol::{ClientMessage, Codec};
use mapcast_session::{IdentityStore, outbound_queue};
use mapcast_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::ServerState;
use crate::MapcastError;

/// Runs the close path when the handler exits.
///
/// The normal exit awaits [`SessionGuard::close`] so presence is settled
/// before the task ends. If the handler unwinds instead, `Drop` spawns the
/// same close path so the registry never keeps a dead session.
struct SessionGuard<S: IdentityStore, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<S, C>>,
    armed: bool,
}

impl<S: IdentityStore, C: Codec> SessionGuard<S, C> {
    async fn close(mut self) {
        self.armed = false;
        self.state.handshake.disconnect(self.conn_id).await;
    }
}

impl<S: IdentityStore, C: Codec> Drop for SessionGuard<S, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                state.handshake.disconnect(conn_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), MapcastError>
where
    S: IdentityStore,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let (tx, mut rx) = outbound_queue();
    state.registry.register(conn_id, tx)?;
    let guard = SessionGuard {
        conn_id,
        state: Arc::clone(&state),
        armed: true,
    };
    tracing::debug!(%conn_id, "session opened");

    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = writer_conn.send_text(frame.as_str()).await {
                tracing::debug!(%conn_id, error = %e, "frame write failed, stopping writer");
                break;
            }
        }
    });

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        match state.codec.decode(&data) {
            Ok(ClientMessage::Auth { token }) => {
                let outcome = state.handshake.authenticate(conn_id, &token).await;
                tracing::debug!(%conn_id, ?outcome, "AUTH processed");
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring inbound frame");
            }
        }
    }

    guard.close().await;
    writer.abort();
    // The peer is usually gone already.
    let _ = conn.close().await;
    Ok(())
}
