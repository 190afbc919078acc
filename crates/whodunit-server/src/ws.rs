use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use whodunit_core::messaging::ChatMessage;
use whodunit_core::net::messages::ClientMessage;
use whodunit_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message};
use whodunit_core::player::ConnectionId;

use crate::hub::{ConnectionHub, UpdateKind};
use crate::registry::{Departure, Seat, SessionRegistry};
use crate::state::{AppState, ConnectionGuard};
use crate::validate::{self, DispatchError};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let connection_id: ConnectionId = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    state.hub.write().await.register(connection_id, tx);
    spawn_writer(ws_sender, rx);
    tracing::debug!(connection_id = %connection_id, "WebSocket connected");

    read_loop(&mut ws_receiver, &state, connection_id).await;

    // Connection gone: keep the seat, tell the others
    let mut registry = state.registry.write().await;
    let departure = registry.handle_disconnect(connection_id);
    let mut hub = state.hub.write().await;
    hub.unregister(connection_id);
    if let Some(departure) = departure
        && let Some(session) = registry.session(&departure.code)
    {
        hub.broadcast_snapshot(
            session,
            UpdateKind::Player,
            &format!("{} disconnected", departure.display_name),
        );
    }
    tracing::debug!(connection_id = %connection_id, "WebSocket closed");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Inbound frame allowance for one connection. Holds at most one second's
/// worth of frames and refills continuously at `per_sec`.
struct InboundBudget {
    allowance: f64,
    per_sec: f64,
    checked_at: Instant,
}

impl InboundBudget {
    fn per_second(per_sec: f64) -> Self {
        Self {
            allowance: per_sec,
            per_sec,
            checked_at: Instant::now(),
        }
    }

    fn spend(&mut self) -> bool {
        self.spend_at(Instant::now())
    }

    fn spend_at(&mut self, now: Instant) -> bool {
        let earned = now.saturating_duration_since(self.checked_at).as_secs_f64() * self.per_sec;
        self.allowance = (self.allowance + earned).min(self.per_sec);
        self.checked_at = now;

        let ok = self.allowance >= 1.0;
        if ok {
            self.allowance -= 1.0;
        }
        ok
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    connection_id: ConnectionId,
) {
    let mut budget = InboundBudget::per_second(state.config.limits.ws_rate_limit_per_sec);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !budget.spend() {
            tracing::warn!(connection_id = %connection_id, "Rate limited");
            continue;
        }

        // Drop oversized messages
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        let msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "Undecodable message");
                state
                    .hub
                    .read()
                    .await
                    .send_error(connection_id, "bad_message", e.to_string());
                continue;
            },
        };

        handle_client_message(state, connection_id, msg).await;
    }
}

/// Apply one client message and deliver the results. Errors go back to the
/// sending connection only.
pub async fn handle_client_message(state: &AppState, connection_id: ConnectionId, msg: ClientMessage) {
    let mut registry = state.registry.write().await;
    let result = dispatch(&mut registry, connection_id, msg);
    let hub = state.hub.read().await;
    match result {
        Ok(outcome) => deliver(&registry, &hub, connection_id, outcome),
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                kind = e.kind(),
                error = %e,
                "Request refused"
            );
            hub.send_error(connection_id, e.kind(), e.to_string());
        },
    }
}

/// What a successful request needs delivered.
#[derive(Debug)]
enum Outcome {
    Seated {
        seat: Seat,
        kind: UpdateKind,
        notice: String,
    },
    Updated {
        code: String,
        notice: String,
    },
    Left(Option<Departure>),
    Chat {
        code: String,
        message: ChatMessage,
    },
    Unchanged,
}

fn updated(code: String, notice: impl Into<String>) -> Outcome {
    Outcome::Updated {
        code,
        notice: notice.into(),
    }
}

fn dispatch(
    registry: &mut SessionRegistry,
    connection_id: ConnectionId,
    msg: ClientMessage,
) -> Result<Outcome, DispatchError> {
    let outcome = match msg {
        ClientMessage::CreateGame(m) => {
            validate::protocol_version(m.protocol_version)?;
            let name = validate::player_name(&m.player_name)?;
            let seat = registry.create_session(connection_id, name, m.scenario_id.as_deref())?;
            Outcome::Seated {
                seat,
                kind: UpdateKind::Game,
                notice: "Game created successfully!".to_string(),
            }
        },
        ClientMessage::JoinGame(m) => {
            validate::protocol_version(m.protocol_version)?;
            let code = validate::game_code(&m.game_code)?;
            let name = validate::player_name(&m.player_name)?;
            let notice = format!("{name} joined the game!");
            let seat = registry.join_session(&code, connection_id, name)?;
            Outcome::Seated {
                seat,
                kind: UpdateKind::Game,
                notice,
            }
        },
        ClientMessage::Reconnect(m) => {
            validate::protocol_version(m.protocol_version)?;
            let code = validate::game_code(&m.game_code)?;
            let seat = registry.reconnect_session(&code, &m.session_token, connection_id)?;
            let name = registry
                .session(&seat.code)
                .and_then(|s| s.player(seat.player_id))
                .map(|p| p.display_name.clone())
                .unwrap_or_default();
            Outcome::Seated {
                seat,
                kind: UpdateKind::Player,
                notice: format!("{name} reconnected"),
            }
        },
        ClientMessage::LeaveGame(_) => Outcome::Left(registry.leave_session(connection_id)),
        ClientMessage::StartGame(_) => updated(registry.start_game(connection_id)?, "Game started!"),
        ClientMessage::AssignCharacter(m) => updated(
            registry.assign_character(connection_id, m.player_id, &m.character_id)?,
            "Character assigned!",
        ),
        ClientMessage::ChangePhase(m) => {
            let (code, _) = registry.change_phase(connection_id, m.phase)?;
            updated(code, format!("Phase changed to {}", m.phase))
        },
        ClientMessage::ReleaseClue(m) => match registry.release_clue(connection_id, &m.clue_id)? {
            (code, true) => updated(code, "New clue revealed!"),
            (_, false) => Outcome::Unchanged,
        },
        ClientMessage::SendMessage(m) => {
            validate::chat_content(&m.content)?;
            let (code, message) =
                registry.send_message(connection_id, m.content, m.is_private, m.recipient_id)?;
            Outcome::Chat { code, message }
        },
        ClientMessage::SubmitAccusation(m) => {
            let claim = validate::accusation(m)?;
            let (code, _) = registry.submit_accusation(connection_id, claim)?;
            updated(code, "Accusation submitted!")
        },
        ClientMessage::RevealSolution(_) => {
            updated(registry.reveal_solution(connection_id)?, "Solution revealed!")
        },
    };
    Ok(outcome)
}

fn deliver(
    registry: &SessionRegistry,
    hub: &ConnectionHub,
    connection_id: ConnectionId,
    outcome: Outcome,
) {
    match outcome {
        Outcome::Seated { seat, kind, notice } => {
            hub.send_joined(connection_id, &seat);
            if let Some(session) = registry.session(&seat.code) {
                hub.broadcast_snapshot(session, kind, &notice);
            }
        },
        Outcome::Updated { code, notice } => {
            if let Some(session) = registry.session(&code) {
                hub.broadcast_snapshot(session, UpdateKind::Game, &notice);
            }
        },
        Outcome::Left(Some(departure)) => {
            if let Some(session) = registry.session(&departure.code) {
                hub.broadcast_snapshot(
                    session,
                    UpdateKind::Game,
                    &format!("{} left the game", departure.display_name),
                );
            }
        },
        Outcome::Chat { code, message } => {
            if let Some(session) = registry.session(&code) {
                hub.route_chat(session, &message);
            }
        },
        Outcome::Left(None) | Outcome::Unchanged => {},
    }
}
