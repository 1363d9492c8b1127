use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, watch,
    },
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{InboundMessage, OutboundMessage, ResultPayload},
    error::ServiceError,
    services::room_service,
    state::{SharedState, notifier::Notification},
};

/// Writer channel closed - connection should be terminated immediately.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// Per-socket bookkeeping: identity, writer channel and the room notification forwarder.
struct Connection {
    id: String,
    outbound: mpsc::UnboundedSender<Message>,
    forwarder: Option<JoinHandle<()>>,
}

impl Connection {
    /// Replace the room notification forwarder.
    fn follow(&mut self, receiver: broadcast::Receiver<Notification>) {
        self.unfollow();
        self.forwarder = Some(tokio::spawn(forward_notifications(
            receiver,
            self.outbound.clone(),
        )));
    }

    /// Stop relaying room notifications.
    fn unfollow(&mut self) {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
    }
}

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut connection = Connection {
        id: Uuid::new_v4().to_string(),
        outbound: outbound_tx.clone(),
        forwarder: None,
    };

    let connected = state.client_connected();
    info!(id = %connection.id, connected, "client connected");
    let counter_task = tokio::spawn(forward_connected_clients(
        state.connected_watcher(),
        outbound_tx.clone(),
    ));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(id = %connection.id, payload = %text, "received client message");

                let reply = match InboundMessage::from_json_str(&text) {
                    Ok(inbound) => {
                        let payload = handle_message(&state, &mut connection, &inbound).await;
                        inbound.result(payload.into())
                    }
                    Err(err) => {
                        warn!(id = %connection.id, error = %err, "failed to parse or validate client message");
                        OutboundMessage::Error(ResultPayload::failure(&err))
                    }
                };

                if send_message_to_websocket(&outbound_tx, &reply).is_err() {
                    info!(id = %connection.id, "connection closed while replying, terminating");
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(id = %connection.id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %connection.id, error = %err, "websocket error");
                break;
            }
        }
    }

    connection.unfollow();
    if let Err(err) = room_service::leave_room(&state, &connection.id).await {
        warn!(id = %connection.id, error = %err, "failed to leave room on disconnect");
    }
    counter_task.abort();

    let connected = state.client_disconnected();
    info!(id = %connection.id, connected, "client disconnected");

    drop(connection);
    finalize(writer_task, outbound_tx).await;
}

/// Run a client command, returning the payload of its result event.
async fn handle_message(
    state: &SharedState,
    connection: &mut Connection,
    message: &InboundMessage,
) -> Result<ResultPayload, ServiceError> {
    match message {
        InboundMessage::CreateRoom => {
            let room = room_service::create_room(state);
            Ok(ResultPayload::with_code(room.code()))
        }
        InboundMessage::JoinRoom(request) => {
            let joined = room_service::join_room(state, &connection.id, request.clone()).await;
            let (room, snapshot, receiver) = match joined {
                Ok(joined) => joined,
                Err(err) => {
                    // A failed switch may already have left the previous room.
                    if state.membership(&connection.id).is_none() {
                        connection.unfollow();
                    }
                    return Err(err);
                }
            };

            // The snapshot goes out before any live notification.
            for message in OutboundMessage::from_snapshot(snapshot) {
                let _ = send_message_to_websocket(&connection.outbound, &message);
            }
            connection.follow(receiver);

            Ok(ResultPayload::with_code(room.code()))
        }
        InboundMessage::LeaveRoom => {
            connection.unfollow();
            let left = room_service::leave_room(state, &connection.id).await?;
            Ok(left.map_or_else(ResultPayload::ok, ResultPayload::with_code))
        }
        InboundMessage::Start => {
            room_service::start(state, &connection.id).await?;
            Ok(ResultPayload::ok())
        }
        InboundMessage::Reset => {
            room_service::reset(state, &connection.id).await?;
            Ok(ResultPayload::ok())
        }
        InboundMessage::Submit(expression) => {
            room_service::submit(state, &connection.id, expression.clone()).await?;
            Ok(ResultPayload::ok())
        }
    }
}

/// Relay a room's notifications to the socket until either side goes away.
async fn forward_notifications(
    mut receiver: broadcast::Receiver<Notification>,
    outbound: mpsc::UnboundedSender<Message>,
) {
    loop {
        tokio::select! {
            _ = outbound.closed() => break,
            recv_result = receiver.recv() => match recv_result {
                Ok(notification) => {
                    let message = OutboundMessage::from(notification);
                    if send_message_to_websocket(&outbound, &message).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    // Skip lagged messages but keep the stream alive.
                    warn!(skipped, "client lagging behind room notifications");
                }
            },
        }
    }
}

/// Push the server-wide connected-client count to the socket, now and on every change.
async fn forward_connected_clients(
    watcher: watch::Receiver<usize>,
    outbound: mpsc::UnboundedSender<Message>,
) {
    let mut counts = WatchStream::new(watcher);
    loop {
        tokio::select! {
            _ = outbound.closed() => break,
            next = counts.next() => {
                let Some(count) = next else { break };
                let message = OutboundMessage::SetConnectedClients(count);
                if send_message_to_websocket(&outbound, &message).is_err() {
                    break;
                }
            }
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::ws::JoinRoomRequest,
        routes,
        state::AppState,
    };
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn decode(message: Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    fn connection(id: &str) -> (Connection, mpsc::UnboundedReceiver<Message>) {
        let (outbound, frames) = mpsc::unbounded_channel();
        let connection = Connection {
            id: id.to_string(),
            outbound,
            forwarder: None,
        };
        (connection, frames)
    }

    fn join(name: &str, code: Option<&str>) -> InboundMessage {
        InboundMessage::JoinRoom(JoinRoomRequest {
            name: name.to_string(),
            code: code.map(str::to_string),
        })
    }

    fn events(frames: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut seen = Vec::new();
        while let Ok(frame) = frames.try_recv() {
            seen.push(decode(frame)["event"].as_str().unwrap().to_string());
        }
        seen
    }

    async fn serve(state: SharedState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes::router(state)).await.unwrap();
        });
        format!("ws://{addr}/ws")
    }

    /// Next frame from the server, ignoring connected-client counts.
    async fn next_event(client: &mut Client) -> Value {
        loop {
            let frame = client.next().await.unwrap().unwrap();
            let value: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
            if value["event"] != "SET_CONNECTED_CLIENTS" {
                return value;
            }
        }
    }

    async fn send(client: &mut Client, text: &str) {
        client
            .send(tungstenite::Message::text(text.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn malformed_frames_get_an_error_and_the_socket_stays_open() {
        let url = serve(AppState::new(AppConfig::default())).await;
        let (mut client, _) = connect_async(url).await.unwrap();

        send(&mut client, "not json").await;
        let reply = next_event(&mut client).await;
        assert_eq!(reply["event"], "ERROR");
        assert_eq!(reply["payload"]["isOK"], false);

        send(&mut client, r#"{"event":"START"}"#).await;
        let reply = next_event(&mut client).await;
        assert_eq!(reply["event"], "START_RESULT");
        assert_eq!(reply["payload"]["isOK"], false);
    }

    #[tokio::test]
    async fn join_sends_the_snapshot_before_live_notifications() {
        let url = serve(AppState::new(AppConfig::default())).await;
        let (mut ada, _) = connect_async(url.clone()).await.unwrap();
        let (mut bob, _) = connect_async(url).await.unwrap();

        send(&mut ada, r#"{"event":"JOIN_ROOM","payload":{"name":"Ada"}}"#).await;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(next_event(&mut ada).await);
        }
        let names: Vec<&str> = seen.iter().map(|v| v["event"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "SET_CURRENT_STATE",
                "SET_CURRENT_PLAYER",
                "SET_CURRENT_QUESTION",
                "SET_PLAYERS",
                "SET_REMAINING_TIME",
                "JOIN_ROOM_RESULT",
            ]
        );
        assert_eq!(seen[0]["payload"], "WAITING");
        assert_eq!(seen[3]["payload"][0]["name"], "Ada");
        assert_eq!(seen[5]["payload"]["isOK"], true);

        send(&mut bob, r#"{"event":"JOIN_ROOM","payload":{"name":"Bob"}}"#).await;
        let live = next_event(&mut ada).await;
        assert_eq!(live["event"], "SET_PLAYERS");
        assert_eq!(live["payload"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_room_switch_stops_following_the_previous_room() {
        let state = AppState::new(AppConfig::default());
        let full = room_service::create_room(&state);
        for id in ["s2", "s3"] {
            let request = JoinRoomRequest {
                name: id.to_string(),
                code: Some(full.code().to_string()),
            };
            room_service::join_room(&state, id, request).await.unwrap();
        }

        let (mut ada, mut frames) = connection("s1");
        handle_message(&state, &mut ada, &join("Ada", None))
            .await
            .unwrap();
        assert!(ada.forwarder.is_some());
        events(&mut frames);

        let err = handle_message(&state, &mut ada, &join("Ada", Some(full.code())))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Game(_)));
        assert!(ada.forwarder.is_none());
        assert!(state.membership("s1").is_none());

        let (mut bob, _bob_frames) = connection("s4");
        handle_message(&state, &mut bob, &join("Bob", None))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(events(&mut frames).is_empty());
    }

    #[tokio::test]
    async fn rejected_join_keeps_the_current_room() {
        let state = AppState::new(AppConfig::default());
        let (mut ada, _frames) = connection("s1");
        handle_message(&state, &mut ada, &join("Ada", None))
            .await
            .unwrap();

        let err = handle_message(&state, &mut ada, &join("Ada", Some("NO-ROOM")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoomNotFound(_)));
        assert!(ada.forwarder.is_some());
        assert_eq!(
            state.membership("s1").as_deref(),
            Some(state.default_room_code())
        );
    }

    #[tokio::test]
    async fn notifications_are_relayed_until_the_stream_closes() {
        let (outbound, mut frames) = mpsc::unbounded_channel();
        let (sender, receiver) = broadcast::channel(8);
        let task = tokio::spawn(forward_notifications(receiver, outbound));

        sender
            .send(Notification::RemainingTimeChanged(42))
            .unwrap();
        drop(sender);
        task.await.unwrap();

        assert_eq!(
            decode(frames.recv().await.unwrap()),
            json!({ "event": "SET_REMAINING_TIME", "payload": 42 })
        );
        assert!(frames.recv().await.is_none());
    }

    #[tokio::test]
    async fn connected_count_is_pushed_on_change() {
        let (outbound, mut frames) = mpsc::unbounded_channel();
        let (counter, watcher) = watch::channel(1usize);
        let task = tokio::spawn(forward_connected_clients(watcher, outbound));

        assert_eq!(
            decode(frames.recv().await.unwrap()),
            json!({ "event": "SET_CONNECTED_CLIENTS", "payload": 1 })
        );
        counter.send(2).unwrap();
        assert_eq!(
            decode(frames.recv().await.unwrap()),
            json!({ "event": "SET_CONNECTED_CLIENTS", "payload": 2 })
        );

        drop(frames);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn closed_writer_is_reported() {
        let (outbound, frames) = mpsc::unbounded_channel();
        drop(frames);
        assert!(send_message_to_websocket(&outbound, &OutboundMessage::SetRemainingTime(1)).is_err());
    }
}
