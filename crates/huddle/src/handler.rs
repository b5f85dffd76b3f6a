//! Per-connection handler: decode client events and route them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Assign the connection's `PlayerId`
//!   2. Loop: receive frames and dispatch them, while draining the
//!      player's outbound queue back onto the socket
//!   3. On close or idle timeout: leave the player's room

use std::sync::Arc;

use huddle_protocol::{ClientEvent, Codec, PlayerId, RoomCode, ServerEvent};
use huddle_room::{GameLogic, PlayerSender, RoomError};
use huddle_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use crate::server::ServerState;
use crate::HuddleError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<G, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<G, C>>,
) -> Result<(), HuddleError>
where
    G: GameLogic,
    C: Codec,
{
    let player_id = PlayerId(conn.id().into_inner());
    tracing::debug!(%player_id, peer = %conn.peer_addr(), "handling new connection");

    // Rooms push to `outbound`; this task is the only writer to the socket.
    let (outbound, mut inbox) = mpsc::unbounded_channel::<ServerEvent<G::Event>>();
    let idle_timeout = state.config.idle_timeout;
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    let result = loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break Err(HuddleError::Transport(e));
                    }
                };
                idle.as_mut().reset(Instant::now() + idle_timeout);
                dispatch(&state, player_id, &outbound, &data).await;
            }
            Some(event) = inbox.recv() => {
                // Encoded before the await so no event borrow spans the write.
                let sent = match state.codec.encode(&event) {
                    Ok(bytes) => conn.send(&bytes).await.map_err(HuddleError::from),
                    Err(e) => Err(HuddleError::from(e)),
                };
                if let Err(e) = sent {
                    break Err(e);
                }
            }
            () = &mut idle => {
                tracing::info!(%player_id, "connection timed out");
                break Ok(());
            }
        }
    };

    leave_room(&state, player_id).await;
    let _ = conn.close().await;
    result
}

/// Decodes one frame and acts on it. Every failure is reported to the
/// player as an `error` event; none of them end the connection.
async fn dispatch<G, C>(
    state: &Arc<ServerState<G, C>>,
    player_id: PlayerId,
    outbound: &PlayerSender<G>,
    data: &[u8],
) where
    G: GameLogic,
    C: Codec,
{
    let event: ClientEvent<G::Action> = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode client event");
            send_error(outbound, format!("Invalid message: {e}"));
            return;
        }
    };

    let result = match event {
        ClientEvent::CreateRoom { player_name, game } => state
            .rooms
            .lock()
            .await
            .create_room(player_id, &player_name, game, outbound.clone())
            .map(|_| ()),

        ClientEvent::JoinRoom {
            room_code,
            player_name,
        } => {
            // A code that cannot parse names no room.
            let code = RoomCode::parse(&room_code)
                .map_err(|_| RoomError::RoomNotFound(room_code.trim().to_string()));
            // Lock only for the lookup; the room's reply is awaited unlocked.
            let handle = match code {
                Ok(code) => {
                    let rooms = state.rooms.lock().await;
                    rooms
                        .ensure_free(player_id)
                        .and_then(|()| rooms.room(&code))
                        .map(|handle| (handle, code))
                }
                Err(e) => Err(e),
            };
            match handle {
                Ok((handle, code)) => match handle.join(player_id, player_name, outbound.clone()).await {
                    Ok(()) => {
                        state.rooms.lock().await.bind_player(player_id, code);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        }

        ClientEvent::StartGame => {
            let handle = state.rooms.lock().await.handle_for(player_id);
            match handle {
                Ok(handle) => handle.start(player_id).await,
                Err(e) => Err(e),
            }
        }

        ClientEvent::LeaveRoom => {
            leave_room(state, player_id).await;
            Ok(())
        }

        ClientEvent::Heartbeat { client_time } => {
            let _ = outbound.send(ServerEvent::HeartbeatAck {
                client_time,
                server_time: state.started.elapsed().as_millis() as u64,
            });
            Ok(())
        }

        ClientEvent::Game(action) => {
            let handle = state.rooms.lock().await.handle_for(player_id);
            match handle {
                Ok(handle) => handle.send_action(player_id, action).await,
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        tracing::debug!(%player_id, error = %e, "request rejected");
        send_error(outbound, e.to_string());
    }
}

/// Takes the player out of their room, if they are in one.
async fn leave_room<G, C>(state: &Arc<ServerState<G, C>>, player_id: PlayerId)
where
    G: GameLogic,
    C: Codec,
{
    let handle = {
        let mut rooms = state.rooms.lock().await;
        let handle = rooms.handle_for(player_id);
        rooms.unbind_player(player_id);
        handle
    };
    if let Ok(handle) = handle {
        if let Err(e) = handle.disconnect(player_id).await {
            tracing::debug!(%player_id, error = %e, "leave room failed");
        }
    }
}

/// Queues an `error` event for this player.
fn send_error<E>(outbound: &mpsc::UnboundedSender<ServerEvent<E>>, message: String) {
    let _ = outbound.send(ServerEvent::Error { message });
}

#[cfg(test)]
mod tests {
    use huddle_games::Party;
    use huddle_protocol::JsonCodec;

    use super::*;

    fn assert_send<T: Send>(_: &T) {}

    // Checked for every `G`: only `Send` may be assumed of a game's events.
    fn connection_future_is_send<G: GameLogic>(
        conn: WebSocketConnection,
        state: Arc<ServerState<G, JsonCodec>>,
    ) {
        assert_send(&handle_connection(conn, state));
    }

    #[test]
    fn test_connection_task_can_be_spawned() {
        let check: fn(WebSocketConnection, Arc<ServerState<Party, JsonCodec>>) =
            connection_future_is_send::<Party>;
        let _ = check;
    }
}
