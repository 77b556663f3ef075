//! Per-connection handler: join handshake, event dispatch, outbound pump.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the join event (with a deadline) and admit the session
//!      through the room manager
//!   2. Spawn a pump task that forwards room outbound traffic to the
//!      socket
//!   3. Loop: receive events → decode → hand to the room
//!   4. On any exit, a drop guard reports the leave so the room and
//!      manager clean up even if this task fails

use std::sync::Arc;
use std::time::Duration;

use galerra_protocol::{
    ClientEvent, Codec, JoinOptions, ProtocolError, SessionId,
};
use galerra_room::{
    REPLACED_CLOSE_CODE, REPLACED_CLOSE_REASON, RoomOutbound,
};
use galerra_transport::{Connection, WebSocketConnection};

use crate::GalerraError;
use crate::server::ServerState;

/// How long a new connection may take to send its join event.
const JOIN_DEADLINE: Duration = Duration::from_secs(10);

/// Drop guard that reports a session's leave when the handler exits.
///
/// Cleanup must happen on every exit path, including panics. `Drop` is
/// synchronous, so the guard spawns a fire-and-forget task for the
/// async manager lock.
struct RoomGuard<C: Codec> {
    session_id: SessionId,
    room_key: String,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for RoomGuard<C> {
    fn drop(&mut self) {
        let session_id = self.session_id;
        let room_key = std::mem::take(&mut self.room_key);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.rooms.lock().await.leave(&room_key, session_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GalerraError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let session_id = conn.id();
    tracing::debug!(%session_id, "handling new connection");

    // --- Step 1: join handshake ---
    let options = await_join(&conn, &state).await?;

    let (outbound_tx, mut outbound_rx) =
        tokio::sync::mpsc::unbounded_channel();

    let join_result = {
        let mut rooms = state.rooms.lock().await;
        rooms.join(session_id, options, outbound_tx).await
    };
    let handle = match join_result {
        Ok(handle) => handle,
        Err(e) => {
            tracing::info!(%session_id, error = %e, "join refused");
            let _ = conn.close().await;
            return Ok(());
        }
    };
    let room_key = handle.room_key().to_string();
    tracing::info!(%session_id, %room_key, "session admitted");

    let _guard = RoomGuard {
        session_id,
        room_key,
        state: Arc::clone(&state),
    };

    // --- Step 2: outbound pump ---
    // Forwards room traffic to the socket until the room drops this
    // session's sender (leave/disposal) or the session is replaced.
    let pump_conn = Arc::clone(&conn);
    let pump_codec = state.codec.clone();
    let pump = tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            match outbound {
                RoomOutbound::Event(event) => {
                    let bytes = match pump_codec.encode(&event) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::warn!(
                                %session_id,
                                error = %e,
                                "failed to encode outbound event"
                            );
                            continue;
                        }
                    };
                    if pump_conn.send(&bytes).await.is_err() {
                        // Socket gone; the recv loop is about to find
                        // out too.
                        break;
                    }
                }
                RoomOutbound::Replaced => {
                    tracing::info!(
                        %session_id,
                        "session replaced, closing connection"
                    );
                    let _ = pump_conn
                        .close_with(
                            REPLACED_CLOSE_CODE,
                            REPLACED_CLOSE_REASON,
                        )
                        .await;
                    break;
                }
            }
        }
    });

    // --- Step 3: event loop ---
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                let event: ClientEvent = match state.codec.decode(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(
                            %session_id,
                            error = %e,
                            "undecodable event, dropping"
                        );
                        continue;
                    }
                };

                if matches!(event, ClientEvent::Join(_)) {
                    tracing::debug!(
                        %session_id,
                        "join on established session, dropping"
                    );
                    continue;
                }

                if handle.send_event(session_id, event).await.is_err() {
                    // Room disposed underneath us; nothing left to do.
                    break;
                }
            }
            Ok(None) => {
                tracing::info!(%session_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                break;
            }
        }
    }

    pump.abort();
    // _guard drops here → leave fires.
    Ok(())
}

/// Waits for the connection's first event, which must be a join.
async fn await_join<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
) -> Result<JoinOptions, GalerraError> {
    let data = match tokio::time::timeout(JOIN_DEADLINE, conn.recv()).await
    {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(GalerraError::Protocol(
                ProtocolError::InvalidEvent(
                    "connection closed before join".into(),
                ),
            ));
        }
        Ok(Err(e)) => return Err(GalerraError::Transport(e)),
        Err(_) => {
            return Err(GalerraError::Protocol(
                ProtocolError::InvalidEvent("join timed out".into()),
            ));
        }
    };

    match state.codec.decode::<ClientEvent>(&data)? {
        ClientEvent::Join(options) => Ok(options),
        other => {
            tracing::debug!(
                session_id = %conn.id(),
                event = ?other,
                "first event was not a join"
            );
            Err(GalerraError::Protocol(ProtocolError::InvalidEvent(
                "first event must be join".into(),
            )))
        }
    }
}
