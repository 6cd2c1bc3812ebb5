//! Console chat client: reads lines from stdin, prints messages from the room.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::client::RelayClient;
use chatrelay::error::{RelayError, RelayResult};
use chatrelay::protocol::{ClientMessage, ServerMessage};
use chatrelay::types::{ChatMessage, ChatRoom, User};

#[derive(Parser, Debug)]
#[command(name = "client", about = "Chat relay console client")]
struct Args {
    /// Address of the relay server
    #[arg(long, default_value = "localhost:8081")]
    addr: String,

    /// Display name
    #[arg(long, default_value = "Default")]
    user: String,

    /// Room to chat in; created if it does not exist
    #[arg(long, default_value = "Default")]
    chatroom: String,

    /// Deadline for registration calls, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

type ChatStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the chat loop ended
#[derive(Debug)]
enum Exit {
    InputClosed,
    ServerClosed,
    Interrupted,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "client=info,chatrelay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(exit) => tracing::info!("Chat ended: {:?}", exit),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> RelayResult<Exit> {
    let relay = RelayClient::new(args.addr.clone(), Duration::from_secs(args.timeout_secs))?;

    let room = relay.find_or_create_room(&args.chatroom).await?;
    tracing::info!("Using chat room {} ({})", room.channel_name, room.channel_id);

    let user_id = uuid::Uuid::new_v4().to_string();
    let user = relay.create_user(&user_id, &args.user).await?;
    tracing::info!("User created: {} ({})", user.user_name, user.user_id);

    let (ws, _) = tokio_tungstenite::connect_async(relay.chat_url())
        .await
        .map_err(|e| RelayError::Startup(format!("could not open chat stream: {}", e)))?;

    chat(ws, &user, &room).await
}

/// Pump stdin lines to the relay and forwarded messages to stdout until
/// input ends, the server goes away, or Ctrl+C. The connection is closed
/// before returning on every path.
async fn chat(ws: ChatStream, user: &User, room: &ChatRoom) -> RelayResult<Exit> {
    let (mut sink, mut stream) = ws.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Message: ");

    let exit = loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        let frame = ClientMessage::Message(ChatMessage::new(user.clone(), room, text));
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("Failed to encode message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::text(json)).await {
                            tracing::error!("Error sending the message: {}", e);
                            break Exit::ServerClosed;
                        }
                    }
                    Ok(None) => break Exit::InputClosed,
                    Err(e) => {
                        tracing::error!("Error reading input: {}", e);
                        break Exit::InputClosed;
                    }
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => show(&text),
                    Some(Ok(Message::Close(_))) | None => {
                        println!("server closed the connection...");
                        break Exit::ServerClosed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("Error receiving message: {}", e);
                        break Exit::ServerClosed;
                    }
                }
            }

            _ = &mut ctrl_c => {
                tracing::info!("Interrupt signal received, shutting down...");
                break Exit::Interrupted;
            }
        }
    };

    // Close our side first; errors here mean the server is already gone
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;

    Ok(exit)
}

fn show(text: &str) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Message(msg)) => {
            println!("{}: {}", msg.user.user_name, msg.content.text);
            println!("Message: ");
        }
        Ok(ServerMessage::Welcome { connection_id, .. }) => {
            tracing::debug!("Connected as {}", connection_id);
        }
        Ok(ServerMessage::Error { code, msg }) => {
            tracing::warn!("Relay error {}: {}", code, msg);
        }
        Err(e) => tracing::warn!("Unreadable frame from relay: {}", e),
    }
}
