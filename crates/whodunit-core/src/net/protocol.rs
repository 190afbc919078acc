use serde::{Deserialize, Serialize};

use super::messages::{
    AssignCharacterMsg, ChangePhaseMsg, ClientMessage, CreateGameMsg, ErrorMsg, GameUpdateMsg,
    JoinGameMsg, JoinedMsg, LeaveGameMsg, MessageType, ReceiveMessageMsg, ReconnectMsg,
    ReleaseClueMsg, RevealSolutionMsg, SendMessageMsg, ServerMessage, SessionClosedMsg,
    StartGameMsg, SubmitAccusationMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum size of an inbound client frame in bytes. Server frames carry
/// whole session snapshots and are not capped.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let mut buf = Vec::with_capacity(1 + payload_bytes.len());
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateGame(m) => encode_message(MessageType::CreateGame, m),
        ClientMessage::JoinGame(m) => encode_message(MessageType::JoinGame, m),
        ClientMessage::LeaveGame(m) => encode_message(MessageType::LeaveGame, m),
        ClientMessage::StartGame(m) => encode_message(MessageType::StartGame, m),
        ClientMessage::AssignCharacter(m) => encode_message(MessageType::AssignCharacter, m),
        ClientMessage::ChangePhase(m) => encode_message(MessageType::ChangePhase, m),
        ClientMessage::ReleaseClue(m) => encode_message(MessageType::ReleaseClue, m),
        ClientMessage::SendMessage(m) => encode_message(MessageType::SendMessage, m),
        ClientMessage::SubmitAccusation(m) => encode_message(MessageType::SubmitAccusation, m),
        ClientMessage::RevealSolution(m) => encode_message(MessageType::RevealSolution, m),
        ClientMessage::Reconnect(m) => encode_message(MessageType::Reconnect, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::Joined(m) => encode_message(MessageType::Joined, m),
        ServerMessage::GameUpdate(m) => encode_message(MessageType::GameUpdate, m),
        ServerMessage::PlayerUpdate(m) => encode_message(MessageType::PlayerUpdate, m),
        ServerMessage::ReceiveMessage(m) => encode_message(MessageType::ReceiveMessage, m),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
        ServerMessage::SessionClosed(m) => encode_message(MessageType::SessionClosed, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`. Frames over
/// [`MAX_MESSAGE_SIZE`] are rejected before decoding.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CreateGame => Ok(ClientMessage::CreateGame(decode_payload::<CreateGameMsg>(
            data,
        )?)),
        MessageType::JoinGame => Ok(ClientMessage::JoinGame(decode_payload::<JoinGameMsg>(
            data,
        )?)),
        MessageType::LeaveGame => Ok(ClientMessage::LeaveGame(decode_payload::<LeaveGameMsg>(
            data,
        )?)),
        MessageType::StartGame => Ok(ClientMessage::StartGame(decode_payload::<StartGameMsg>(
            data,
        )?)),
        MessageType::AssignCharacter => Ok(ClientMessage::AssignCharacter(decode_payload::<
            AssignCharacterMsg,
        >(data)?)),
        MessageType::ChangePhase => Ok(ClientMessage::ChangePhase(
            decode_payload::<ChangePhaseMsg>(data)?,
        )),
        MessageType::ReleaseClue => Ok(ClientMessage::ReleaseClue(
            decode_payload::<ReleaseClueMsg>(data)?,
        )),
        MessageType::SendMessage => Ok(ClientMessage::SendMessage(
            decode_payload::<SendMessageMsg>(data)?,
        )),
        MessageType::SubmitAccusation => Ok(ClientMessage::SubmitAccusation(decode_payload::<
            SubmitAccusationMsg,
        >(data)?)),
        MessageType::RevealSolution => Ok(ClientMessage::RevealSolution(decode_payload::<
            RevealSolutionMsg,
        >(data)?)),
        MessageType::Reconnect => Ok(ClientMessage::Reconnect(decode_payload::<ReconnectMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Joined => Ok(ServerMessage::Joined(decode_payload::<JoinedMsg>(data)?)),
        MessageType::GameUpdate => Ok(ServerMessage::GameUpdate(Box::new(decode_payload::<
            GameUpdateMsg,
        >(data)?))),
        MessageType::PlayerUpdate => Ok(ServerMessage::PlayerUpdate(Box::new(decode_payload::<
            GameUpdateMsg,
        >(data)?))),
        MessageType::ReceiveMessage => Ok(ServerMessage::ReceiveMessage(decode_payload::<
            ReceiveMessageMsg,
        >(data)?)),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        MessageType::SessionClosed => Ok(ServerMessage::SessionClosed(decode_payload::<
            SessionClosedMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
