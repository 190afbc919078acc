use serde::{Deserialize, Serialize};

use crate::messaging::ChatMessage;
use crate::player::PlayerId;
use crate::session::GamePhase;
use crate::snapshot::SessionSnapshot;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateGame = 0x01,
    JoinGame = 0x02,
    LeaveGame = 0x03,
    StartGame = 0x04,
    AssignCharacter = 0x05,
    ChangePhase = 0x06,
    ReleaseClue = 0x07,
    SendMessage = 0x08,
    SubmitAccusation = 0x09,
    RevealSolution = 0x0A,
    Reconnect = 0x0B,

    // Server -> Client
    Joined = 0x10,
    GameUpdate = 0x11,
    PlayerUpdate = 0x12,
    ReceiveMessage = 0x13,
    Error = 0x14,
    SessionClosed = 0x15,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateGame),
            0x02 => Some(Self::JoinGame),
            0x03 => Some(Self::LeaveGame),
            0x04 => Some(Self::StartGame),
            0x05 => Some(Self::AssignCharacter),
            0x06 => Some(Self::ChangePhase),
            0x07 => Some(Self::ReleaseClue),
            0x08 => Some(Self::SendMessage),
            0x09 => Some(Self::SubmitAccusation),
            0x0A => Some(Self::RevealSolution),
            0x0B => Some(Self::Reconnect),
            0x10 => Some(Self::Joined),
            0x11 => Some(Self::GameUpdate),
            0x12 => Some(Self::PlayerUpdate),
            0x13 => Some(Self::ReceiveMessage),
            0x14 => Some(Self::Error),
            0x15 => Some(Self::SessionClosed),
            _ => None,
        }
    }
}

// --- Client -> Server payloads ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameMsg {
    pub player_name: String,
    pub scenario_id: Option<String>,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGameMsg {
    pub game_code: String,
    pub player_name: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGameMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCharacterMsg {
    pub player_id: PlayerId,
    pub character_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePhaseMsg {
    pub phase: GamePhase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseClueMsg {
    pub clue_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageMsg {
    pub content: String,
    pub is_private: bool,
    pub recipient_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAccusationMsg {
    pub murderer: String,
    pub motive: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealSolutionMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectMsg {
    pub game_code: String,
    pub session_token: String,
    pub protocol_version: u8,
}

// --- Server -> Client payloads ---

/// Sent only to the connection that created, joined, or reconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMsg {
    pub player_id: PlayerId,
    pub game_code: String,
    pub session_token: String,
}

/// Session snapshot for one recipient plus a human-readable notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdateMsg {
    pub game: SessionSnapshot,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveMessageMsg {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClosedMsg {
    pub game_code: String,
    pub reason: String,
}

/// All messages a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateGame(CreateGameMsg),
    JoinGame(JoinGameMsg),
    LeaveGame(LeaveGameMsg),
    StartGame(StartGameMsg),
    AssignCharacter(AssignCharacterMsg),
    ChangePhase(ChangePhaseMsg),
    ReleaseClue(ReleaseClueMsg),
    SendMessage(SendMessageMsg),
    SubmitAccusation(SubmitAccusationMsg),
    RevealSolution(RevealSolutionMsg),
    Reconnect(ReconnectMsg),
}

/// All messages the server can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Joined(JoinedMsg),
    GameUpdate(Box<GameUpdateMsg>),
    PlayerUpdate(Box<GameUpdateMsg>),
    ReceiveMessage(ReceiveMessageMsg),
    Error(ErrorMsg),
    SessionClosed(SessionClosedMsg),
}
