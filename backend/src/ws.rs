use crate::client::{Client, Clients, SendMsg, Sender, Status};
use crate::session::{Session, Sessions};
use crate::util;
use common::{
    messages::{ClientMessage, Mode, ServerMessage},
    PlayerNum,
};
use futures::{FutureExt, StreamExt};
use hashbrown::HashMap;
use serde_json::from_str;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

pub async fn client_connection(
    ws: WebSocket,
    id: String,
    clients: Clients,
    mut client: Client,
    sessions: Sessions,
) {
    let (client_ws_sender, mut client_ws_rcv) = ws.split();
    let (client_sender, client_rcv) = mpsc::unbounded_channel();

    let client_rcv = UnboundedReceiverStream::new(client_rcv);
    tokio::task::spawn(client_rcv.forward(client_ws_sender).map(|result| {
        if let Err(e) = result {
            error!("error sending websocket msg: {}", e);
        }
    }));

    let sender = Sender(client_sender);
    client.sender = Some(sender.clone());
    client.status = Status::ChoosingMode;
    clients.write().await.insert(id.clone(), client);

    info!("{} connected", id);

    // Every connection starts by choosing a game mode
    send_to(&sender, &ServerMessage::ModePrompt);

    while let Some(result) = client_ws_rcv.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                error!("error receiving ws message for id {}: {}", id, e);
                break;
            }
        };
        client_msg(&id, msg, &clients, &sessions).await;
    }

    disconnect(&id, &clients, &sessions).await;
}

#[tracing::instrument(skip(clients, sessions))]
async fn client_msg(id: &str, msg: Message, clients: &Clients, sessions: &Sessions) {
    info!("received message from {}: {:?}", id, msg);
    let message = match msg.to_str() {
        Ok(v) => v.trim(),
        Err(_) => return,
    };

    if message == "ping" {
        return;
    }

    let mut clients_map = clients.write().await;
    let client = match clients_map.get_mut(id) {
        Some(v) => v,
        None => {
            error!(
                "Message from client {} did not match any connected clients",
                id
            );
            return;
        }
    };
    match client.status.clone() {
        Status::ChoosingMode => match from_str(message) {
            Ok(ClientMessage::ModeSelection(Mode::Single)) => {
                start_single(id, &mut clients_map, sessions).await;
            }
            Ok(ClientMessage::ModeSelection(Mode::Multi)) => {
                join_multi(id, &mut clients_map, sessions).await;
            }
            other => {
                warn!("expected a mode selection from {}, got {:?}", id, other);
                if let Some(sender) = &client.sender {
                    send_to(sender, &ServerMessage::ModePrompt);
                }
            }
        },
        // Parked until a second two-player connection arrives
        Status::WaitingForOpponent => {}
        Status::InGame { uuid, player_num } => {
            let mut sessions_map = sessions.write().await;
            let session = match sessions_map.get_mut(&uuid) {
                Some(v) => v,
                None => {
                    error!("Session with ID {} did not match any existing sessions", uuid);
                    return;
                }
            };
            let opponent_id = session.opponent_id(id);
            match &opponent_id {
                Some(opponent_id) => {
                    match clients_map.get_many_mut([id, opponent_id.as_str()]) {
                        Some([client, opponent]) => {
                            session.handle_message(
                                player_num,
                                message,
                                client.sender.as_ref().unwrap(),
                                Some(opponent.sender.as_ref().unwrap()),
                            );
                        }
                        // The opponent is already mid-disconnect; finish the
                        // teardown from this side
                        None => {
                            warn!(
                                "opponent {} of client {} is no longer connected; discarding session {}",
                                opponent_id, id, uuid
                            );
                            sessions_map.remove(&uuid);
                            clients_map.remove(id);
                            return;
                        }
                    }
                }
                None => {
                    session.handle_message(
                        player_num,
                        message,
                        client.sender.as_ref().unwrap(),
                        None,
                    );
                }
            }
            if session.is_over() {
                info!("session {} is over", uuid);
                sessions_map.remove(&uuid);
                // Dropping the senders closes the underlying sockets
                clients_map.remove(id);
                if let Some(opponent_id) = opponent_id {
                    clients_map.remove(&opponent_id);
                }
            }
        }
    }
}

async fn start_single(id: &str, clients: &mut HashMap<String, Client>, sessions: &Sessions) {
    let client = match clients.get_mut(id) {
        Some(v) => v,
        None => {
            error!("Client {} not in list of registered clients", id);
            return;
        }
    };
    let session = Session::versus_computer(id.to_string());
    session.start(client.sender.as_ref().unwrap(), None);

    let session_uuid = Uuid::new_v4().as_simple().to_string();
    info!(
        "client {} starting a game against the computer ({})",
        id, session_uuid
    );
    sessions.write().await.insert(session_uuid.clone(), session);
    client.status = Status::InGame {
        uuid: session_uuid,
        player_num: PlayerNum::P1,
    };
}

async fn join_multi(id: &str, clients: &mut HashMap<String, Client>, sessions: &Sessions) {
    let mut waiting_clients = clients
        .iter_mut()
        .filter(|(_, c)| matches!(c.status, Status::WaitingForOpponent))
        .map(|(id, _)| id);
    if let Some(opponent_id) = waiting_clients.next() {
        let opponent_id = opponent_id.clone();
        let [client, opponent] = clients.get_many_mut([id, opponent_id.as_str()]).unwrap();

        // The earlier arrival is seated as Player 1 and moves first
        let session = Session::versus_human(opponent_id.clone(), id.to_string());
        session.start(
            opponent.sender.as_ref().unwrap(),
            Some(client.sender.as_ref().unwrap()),
        );

        let session_uuid = Uuid::new_v4().as_simple().to_string();
        info!(
            "paired clients {} and {} into session {}",
            opponent_id, id, session_uuid
        );
        sessions.write().await.insert(session_uuid.clone(), session);
        opponent.status = Status::InGame {
            uuid: session_uuid.clone(),
            player_num: PlayerNum::P1,
        };
        client.status = Status::InGame {
            uuid: session_uuid,
            player_num: PlayerNum::P2,
        };
    } else {
        match clients.get_mut(id) {
            Some(c) => c.status = Status::WaitingForOpponent,
            None => error!("Joining client {} not in list of registered clients", id),
        }
    }
}

// A dropped or failed connection is fatal to its own session only: the
// session is discarded and the remaining participant's socket is closed.
async fn disconnect(id: &str, clients: &Clients, sessions: &Sessions) {
    let removed = clients.write().await.remove(id);
    info!("{} disconnected", id);
    let Some(client) = removed else { return };
    if let Status::InGame { uuid, .. } = client.status {
        let session = sessions.write().await.remove(&uuid);
        if let Some(session) = session {
            info!("discarding session {} after a disconnect", uuid);
            if let Some(opponent_id) = session.opponent_id(id) {
                if let Some(opponent) = clients.write().await.remove(&opponent_id) {
                    if let Some(sender) = opponent.sender {
                        send_to(&sender, &ServerMessage::Farewell);
                    }
                }
            }
        }
    }
}

fn send_to(sender: &Sender, message: &ServerMessage) {
    // If we cannot serialize a server message, that's a bug
    let encoded = serde_json::to_string(message).unwrap();
    // If the message fails to send even after retries, there's not much we can do but proceed
    let _ = util::retry(1, || sender.send(&encoded));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    type Rx = mpsc::UnboundedReceiver<Result<Message, warp::Error>>;

    fn in_game(uuid: &str, player_num: PlayerNum) -> (Client, Rx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Client {
            status: Status::InGame {
                uuid: uuid.to_string(),
                player_num,
            },
            sender: Some(Sender(tx)),
        };
        (client, rx)
    }

    // Two humans registered and mid-session, with their receiver ends kept
    async fn paired_maps() -> (Clients, Sessions, Rx, Rx) {
        let clients: Clients = Arc::new(RwLock::new(HashMap::new()));
        let sessions: Sessions = Arc::new(RwLock::new(HashMap::new()));
        let session = Session::versus_human("p1".to_string(), "p2".to_string());
        sessions.write().await.insert("game".to_string(), session);
        let (p1, p1_rx) = in_game("game", PlayerNum::P1);
        let (p2, p2_rx) = in_game("game", PlayerNum::P2);
        let mut clients_map = clients.write().await;
        clients_map.insert("p1".to_string(), p1);
        clients_map.insert("p2".to_string(), p2);
        drop(clients_map);
        (clients, sessions, p1_rx, p2_rx)
    }

    fn decode(msg: Message) -> ServerMessage {
        from_str(msg.to_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_disconnect_discards_the_session_and_closes_the_peer() {
        let (clients, sessions, mut p1_rx, _p2_rx) = paired_maps().await;

        disconnect("p2", &clients, &sessions).await;

        assert!(sessions.read().await.is_empty());
        assert!(clients.read().await.is_empty());
        let farewell = p1_rx.recv().await.unwrap().unwrap();
        assert_eq!(decode(farewell), ServerMessage::Farewell);
        // With the senders gone the channel closes, and the socket with it
        assert!(p1_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_of_an_unpaired_client_leaves_others_alone() {
        let (clients, sessions, mut p1_rx, _p2_rx) = paired_maps().await;
        let (lobby_tx, _lobby_rx) = mpsc::unbounded_channel();
        clients.write().await.insert(
            "p3".to_string(),
            Client {
                status: Status::WaitingForOpponent,
                sender: Some(Sender(lobby_tx)),
            },
        );

        disconnect("p3", &clients, &sessions).await;

        assert_eq!(sessions.read().await.len(), 1);
        assert_eq!(clients.read().await.len(), 2);
        assert!(p1_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_message_after_the_peer_entry_is_gone_discards_the_session() {
        let (clients, sessions, mut p1_rx, _p2_rx) = paired_maps().await;
        // p2's registry entry is already removed but its teardown has not
        // reached the session yet
        clients.write().await.remove("p2");

        let column = serde_json::to_string(&ClientMessage::ColumnChoice(4)).unwrap();
        client_msg("p1", Message::text(column), &clients, &sessions).await;

        assert!(sessions.read().await.is_empty());
        assert!(clients.read().await.is_empty());
        assert!(p1_rx.recv().await.is_none());
    }
}
