use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;

use whodunit_core::messaging::ChatMessage;
use whodunit_core::net::messages::{
    ErrorMsg, GameUpdateMsg, JoinedMsg, ReceiveMessageMsg, ServerMessage, SessionClosedMsg,
};
use whodunit_core::net::protocol::encode_server_message;
use whodunit_core::player::{ConnectionId, PlayerId};
use whodunit_core::session::GameSession;
use whodunit_core::snapshot::SessionSnapshot;

use crate::registry::{EvictedSession, Seat};

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot exhaust memory; full channels are skipped.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Which server message carries a snapshot broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Game state changed (joins, phases, clues, accusations).
    Game,
    /// Presence changed (disconnects, reconnects).
    Player,
}

/// Outbound channels for every open WebSocket, keyed by connection id.
#[derive(Default)]
pub struct ConnectionHub {
    senders: HashMap<ConnectionId, PlayerSender>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection_id: ConnectionId, sender: PlayerSender) {
        self.senders.insert(connection_id, sender);
    }

    pub fn unregister(&mut self, connection_id: ConnectionId) {
        self.senders.remove(&connection_id);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Queue raw bytes for one connection. Unknown connections are ignored.
    pub fn send_raw(&self, connection_id: ConnectionId, data: Bytes) {
        if let Some(sender) = self.senders.get(&connection_id)
            && let Err(e) = sender.try_send(data)
        {
            tracing::debug!(
                connection_id = %connection_id, error = %e,
                "Failed to send to connection (slow or disconnected)"
            );
        }
    }

    pub fn send(&self, connection_id: ConnectionId, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.send_raw(connection_id, Bytes::from(data)),
            Err(e) => tracing::warn!(connection_id = %connection_id, error = %e, "Failed to encode message"),
        }
    }

    pub fn send_joined(&self, connection_id: ConnectionId, seat: &Seat) {
        self.send(
            connection_id,
            &ServerMessage::Joined(JoinedMsg {
                player_id: seat.player_id,
                game_code: seat.code.clone(),
                session_token: seat.session_token.clone(),
            }),
        );
    }

    pub fn send_error(&self, connection_id: ConnectionId, kind: &str, message: String) {
        self.send(
            connection_id,
            &ServerMessage::Error(ErrorMsg {
                kind: kind.to_string(),
                message,
            }),
        );
    }

    /// Send each connected player their own snapshot of `session`.
    pub fn broadcast_snapshot(&self, session: &GameSession, kind: UpdateKind, notice: &str) {
        for player in session.connected_players() {
            let update = Box::new(GameUpdateMsg {
                game: SessionSnapshot::for_viewer(session, Some(player.id)),
                message: notice.to_string(),
            });
            let msg = match kind {
                UpdateKind::Game => ServerMessage::GameUpdate(update),
                UpdateKind::Player => ServerMessage::PlayerUpdate(update),
            };
            self.send(player.connection_id, &msg);
        }
    }

    /// Deliver a chat message: direct messages go to sender and recipient,
    /// everything else to the whole session.
    pub fn route_chat(&self, session: &GameSession, message: &ChatMessage) {
        let msg = ServerMessage::ReceiveMessage(ReceiveMessageMsg {
            message: message.clone(),
        });
        let data = match encode_server_message(&msg) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                tracing::warn!(code = %session.code, error = %e, "Failed to encode chat message");
                return;
            },
        };

        let audience: Vec<PlayerId> = match message.direct_recipient() {
            Some(recipient) => vec![message.sender_id, recipient],
            None => session.players.iter().map(|p| p.id).collect(),
        };
        for player in session
            .connected_players()
            .filter(|p| audience.contains(&p.id))
        {
            self.send_raw(player.connection_id, data.clone());
        }
    }

    /// Tell every seat of an evicted session that it is gone.
    pub fn notify_evicted(&self, evicted: &EvictedSession) {
        let msg = ServerMessage::SessionClosed(SessionClosedMsg {
            game_code: evicted.code.clone(),
            reason: "Game expired".to_string(),
        });
        let Ok(data) = encode_server_message(&msg) else {
            return;
        };
        let data = Bytes::from(data);
        for &connection_id in &evicted.connection_ids {
            self.send_raw(connection_id, data.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;
    use whodunit_core::net::protocol::decode_server_message;
    use whodunit_core::session::GamePhase;
    use whodunit_core::snapshot::SNAPSHOT_CHAT_TAIL;
    use whodunit_core::test_helpers::full_session;

    use super::*;

    fn make_sender() -> (PlayerSender, mpsc::Receiver<Bytes>) {
        mpsc::channel(16)
    }

    fn drain(rx: &mut mpsc::Receiver<Bytes>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(data) = rx.try_recv() {
            out.push(decode_server_message(&data).unwrap());
        }
        out
    }

    /// Register a channel for every player of a `full_session(n)`.
    fn wired(n: usize) -> (ConnectionHub, GameSession, Vec<mpsc::Receiver<Bytes>>) {
        let (session, _) = full_session(n);
        let mut hub = ConnectionHub::new();
        let mut receivers = Vec::new();
        for p in &session.players {
            let (tx, rx) = make_sender();
            hub.register(p.connection_id, tx);
            receivers.push(rx);
        }
        (hub, session, receivers)
    }

    #[test]
    fn snapshot_broadcast_is_per_viewer() {
        let (hub, mut session, mut rxs) = wired(3);
        let ids: Vec<_> = session.players.iter().map(|p| p.id).collect();
        session
            .assign_character(ids[0], ids[1], "char_butler")
            .unwrap();

        hub.broadcast_snapshot(&session, UpdateKind::Game, "Character assigned!");

        for (i, rx) in rxs.iter_mut().enumerate() {
            let msgs = drain(rx);
            assert_eq!(msgs.len(), 1);
            let ServerMessage::GameUpdate(update) = &msgs[0] else {
                panic!("expected GameUpdate, got {:?}", msgs[0]);
            };
            assert_eq!(update.message, "Character assigned!");
            let briefs = update
                .game
                .scenario
                .characters
                .iter()
                .filter(|c| c.brief.is_some())
                .count();
            assert_eq!(briefs, usize::from(i == 1));
        }
    }

    #[test]
    fn disconnected_players_are_skipped() {
        let (hub, mut session, mut rxs) = wired(2);
        let conn = session.players[1].connection_id;
        session.mark_disconnected(conn);

        hub.broadcast_snapshot(&session, UpdateKind::Player, "P1 disconnected");
        assert!(matches!(
            drain(&mut rxs[0]).as_slice(),
            [ServerMessage::PlayerUpdate(_)]
        ));
        assert!(drain(&mut rxs[1]).is_empty());
    }

    #[test]
    fn direct_chat_reaches_only_pair() {
        let (hub, mut session, mut rxs) = wired(3);
        let ids: Vec<_> = session.players.iter().map(|p| p.id).collect();
        let msg = session
            .post_message(ids[0], "psst".into(), true, Some(ids[2]), 0)
            .unwrap();

        hub.route_chat(&session, &msg);
        assert_eq!(drain(&mut rxs[0]).len(), 1);
        assert!(drain(&mut rxs[1]).is_empty());
        assert_eq!(drain(&mut rxs[2]).len(), 1);
    }

    #[test]
    fn public_chat_reaches_everyone() {
        let (hub, mut session, mut rxs) = wired(3);
        let sender = session.players[1].id;
        let msg = session
            .post_message(sender, "hello".into(), false, None, 0)
            .unwrap();
        hub.route_chat(&session, &msg);
        for rx in &mut rxs {
            assert!(matches!(
                drain(rx).as_slice(),
                [ServerMessage::ReceiveMessage(m)] if m.message.content == "hello"
            ));
        }
    }

    #[test]
    fn phase_change_reaches_everyone_after_long_chat() {
        let (hub, mut session, mut rxs) = wired(4);
        let ids: Vec<_> = session.players.iter().map(|p| p.id).collect();
        for i in 0..64 {
            session
                .post_message(ids[i % 4], "x".repeat(1024), false, None, i as u64)
                .unwrap();
        }
        session.change_phase(ids[0], GamePhase::Accusation).unwrap();

        hub.broadcast_snapshot(&session, UpdateKind::Game, "Phase changed to accusation");
        for rx in &mut rxs {
            match drain(rx).as_slice() {
                [ServerMessage::GameUpdate(update)] => {
                    assert_eq!(update.game.phase, GamePhase::Accusation);
                    assert_eq!(update.game.chat_messages.len(), SNAPSHOT_CHAT_TAIL);
                },
                other => panic!("expected one GameUpdate, got {other:?}"),
            }
        }
    }

    #[test]
    fn full_channel_is_skipped() {
        let mut hub = ConnectionHub::new();
        let (tx, mut rx) = mpsc::channel(1);
        let conn = Uuid::new_v4();
        hub.register(conn, tx);
        hub.send_error(conn, "a", "first".into());
        hub.send_error(conn, "b", "second".into());
        assert_eq!(drain(&mut rx).len(), 1);

        hub.unregister(conn);
        assert!(hub.is_empty());
        hub.send_error(conn, "c", "ignored".into());
    }

    #[test]
    fn evicted_seats_get_session_closed() {
        let mut hub = ConnectionHub::new();
        let (tx, mut rx) = make_sender();
        let conn = Uuid::new_v4();
        hub.register(conn, tx);
        hub.notify_evicted(&EvictedSession {
            code: "ABC123".into(),
            phase: GamePhase::Finished,
            connection_ids: vec![conn, Uuid::new_v4()],
        });
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::SessionClosed(m)] if m.game_code == "ABC123"
        ));
    }
}
