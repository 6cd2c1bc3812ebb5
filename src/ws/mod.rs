pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::Sink, sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::error::RelayError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::{AppState, StreamHandle};
use handlers::Session;

/// How long a closing connection waits for queued frames to reach the socket
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("Chat stream connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one chat stream: Open -> Receiving -> Closed(clean | error)
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut receiver) = socket.split();
    let (handle, outbox) = StreamHandle::channel();
    let connection_id = handle.connection_id().to_string();

    tracing::info!("Chat stream opened: {}", connection_id);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        connection_id: connection_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if handle.send(welcome).is_err() {
        return;
    }

    let mut writer = spawn_writer(sink, outbox);
    let mut writer_done = false;
    let mut session = Session::new(handle);

    let closed: Result<(), RelayError> = loop {
        tokio::select! {
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(reply) =
                                    handlers::handle_message(client_msg, &mut session, &state).await
                                {
                                    let _ = session.handle.send(reply);
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client frame: {}", e);
                                let _ = session.handle.send(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                });
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(RelayError::StreamTransport(e.to_string())),
                }
            }

            _ = &mut writer => {
                writer_done = true;
                break Err(RelayError::StreamTransport("write side closed".to_string()));
            }
        }
    };

    // Detaching and dropping the session releases every sender for `outbox`,
    // so the writer flushes what is queued and closes the socket.
    session.close(&state).await;
    drop(session);
    if !writer_done {
        drain_writer(writer).await;
    }

    match closed {
        Ok(()) => tracing::info!("Chat stream closed: {}", connection_id),
        Err(e) => tracing::error!("Chat stream {} failed: {}", connection_id, e),
    }
}

/// Spawn the sole writer for a connection. Everything sent to the connection,
/// including forwards from other streams, goes through `outbox`. The sink is
/// closed once every sender is gone.
fn spawn_writer<S>(mut sink: S, mut outbox: UnboundedReceiver<ServerMessage>) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        let _ = sink.close().await;
    })
}

/// Wait for the writer to finish, aborting it if a peer stops reading
async fn drain_writer(mut writer: JoinHandle<()>) {
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::warn!("Writer did not drain within {:?}, aborting", WRITER_DRAIN_TIMEOUT);
        writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, RoomRef, User};

    fn chat(text: &str) -> ChatMessage {
        ChatMessage::new(
            User {
                user_id: "u1".to_string(),
                user_name: "alice".to_string(),
            },
            RoomRef {
                channel_id: "r1".to_string(),
                channel_name: "lobby".to_string(),
            },
            text,
        )
    }

    #[tokio::test]
    async fn test_writer_flushes_queue_before_closing() {
        let (sink, socket) = futures::channel::mpsc::unbounded::<Message>();
        let (handle, outbox) = StreamHandle::channel();
        let writer = spawn_writer(sink, outbox);

        for text in ["one", "two", "three"] {
            handle.push(chat(text)).unwrap();
        }
        drop(handle);
        drain_writer(writer).await;

        // `collect` only ends once the writer has closed the sink
        let frames: Vec<Message> = socket.collect().await;
        let texts: Vec<String> = frames
            .into_iter()
            .map(|frame| match frame {
                Message::Text(json) => match serde_json::from_str::<ServerMessage>(&json).unwrap() {
                    ServerMessage::Message(msg) => msg.content.text,
                    other => panic!("Unexpected frame {:?}", other),
                },
                other => panic!("Unexpected message {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_writer_stops_when_socket_is_gone() {
        let (sink, socket) = futures::channel::mpsc::unbounded::<Message>();
        drop(socket);
        let (handle, outbox) = StreamHandle::channel();
        let writer = spawn_writer(sink, outbox);

        handle.push(chat("lost")).unwrap();
        // The writer exits on the failed send even though `handle` is still alive
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer should stop")
            .unwrap();
        assert!(handle.is_closed());
    }
}
