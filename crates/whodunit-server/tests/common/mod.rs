use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use whodunit_core::catalog::ScenarioCatalog;
use whodunit_core::net::messages::{
    ClientMessage, CreateGameMsg, GameUpdateMsg, JoinGameMsg, JoinedMsg, ServerMessage,
};
use whodunit_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};

use whodunit_server::build_app;
use whodunit_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config, ScenarioCatalog::builtin().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Expect a GameUpdate next and return it.
pub async fn ws_read_game_update(stream: &mut WsStream) -> GameUpdateMsg {
    match ws_read_server_msg(stream).await {
        ServerMessage::GameUpdate(update) => *update,
        other => panic!("Expected GameUpdate, got: {other:?}"),
    }
}

/// Expect an Error next and return its kind.
pub async fn ws_read_error_kind(stream: &mut WsStream) -> String {
    match ws_read_server_msg(stream).await {
        ServerMessage::Error(e) => e.kind,
        other => panic!("Expected Error, got: {other:?}"),
    }
}

/// Create a game and consume the Joined + GameUpdate pair.
pub async fn ws_create_game(stream: &mut WsStream, name: &str) -> JoinedMsg {
    let msg = ClientMessage::CreateGame(CreateGameMsg {
        player_name: name.to_string(),
        scenario_id: None,
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;
    let joined = match ws_read_server_msg(stream).await {
        ServerMessage::Joined(j) => j,
        other => panic!("Expected Joined, got: {other:?}"),
    };
    let update = ws_read_game_update(stream).await;
    assert_eq!(update.message, "Game created successfully!");
    joined
}

/// Join a game and consume the Joined + GameUpdate pair on the joiner.
/// Everyone already seated also receives a GameUpdate; the caller drains it.
pub async fn ws_join_game(stream: &mut WsStream, code: &str, name: &str) -> JoinedMsg {
    let msg = ClientMessage::JoinGame(JoinGameMsg {
        game_code: code.to_string(),
        player_name: name.to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;
    let joined = match ws_read_server_msg(stream).await {
        ServerMessage::Joined(j) => j,
        other => panic!("Expected Joined, got: {other:?}"),
    };
    ws_read_game_update(stream).await;
    joined
}

/// A host plus `guests` joined players, with every pending update drained.
pub async fn ws_seated_table(
    server: &TestServer,
    guests: usize,
) -> (Vec<WsStream>, Vec<JoinedMsg>) {
    let mut host = ws_connect(&server.ws_url()).await;
    let host_seat = ws_create_game(&mut host, "Host").await;
    let code = host_seat.game_code.clone();
    let mut streams = vec![host];
    let mut seats = vec![host_seat];

    for i in 0..guests {
        let mut guest = ws_connect(&server.ws_url()).await;
        let seat = ws_join_game(&mut guest, &code, &format!("Guest{i}")).await;
        for earlier in &mut streams {
            ws_read_game_update(earlier).await;
        }
        streams.push(guest);
        seats.push(seat);
    }
    (streams, seats)
}
