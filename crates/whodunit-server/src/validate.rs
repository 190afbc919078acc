//! Checks applied to client payloads before they reach the registry.

use whodunit_core::code::{is_valid_session_code, normalize_code};
use whodunit_core::error::SessionError;
use whodunit_core::messaging::AccusationClaim;
use whodunit_core::net::messages::SubmitAccusationMsg;
use whodunit_core::net::protocol::PROTOCOL_VERSION;

pub const MAX_NAME_CHARS: usize = 32;
pub const MAX_CHAT_CHARS: usize = 1024;
pub const MAX_ACCUSATION_FIELD_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Player name must be 1-{max} characters with no control characters", max = MAX_NAME_CHARS)]
    InvalidName,
    #[error("Invalid game code")]
    InvalidCode,
    #[error("Message must be 1-{max} characters", max = MAX_CHAT_CHARS)]
    InvalidMessage,
    #[error("Accusation fields must be 1-{max} characters", max = MAX_ACCUSATION_FIELD_CHARS)]
    InvalidAccusation,
    #[error("Protocol version mismatch: client={client}, server={server}", server = PROTOCOL_VERSION)]
    ProtocolMismatch { client: u8 },
}

impl InputError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::InvalidCode => "invalid_code",
            Self::InvalidMessage => "invalid_message",
            Self::InvalidAccusation => "invalid_accusation",
            Self::ProtocolMismatch { .. } => "protocol_mismatch",
        }
    }
}

/// Any reason a client request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(e) => e.kind(),
            Self::Session(e) => e.kind(),
        }
    }
}

/// Trimmed display name.
pub fn player_name(raw: &str) -> Result<String, InputError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS || name.chars().any(char::is_control) {
        return Err(InputError::InvalidName);
    }
    Ok(name.to_string())
}

/// Canonical (uppercase) game code.
pub fn game_code(raw: &str) -> Result<String, InputError> {
    let code = raw.trim();
    if !is_valid_session_code(code) {
        return Err(InputError::InvalidCode);
    }
    Ok(normalize_code(code))
}

/// Chat content; newlines are the only control characters allowed.
pub fn chat_content(raw: &str) -> Result<(), InputError> {
    let len = raw.chars().count();
    if raw.trim().is_empty()
        || len > MAX_CHAT_CHARS
        || raw.chars().any(|c| c.is_control() && c != '\n')
    {
        return Err(InputError::InvalidMessage);
    }
    Ok(())
}

pub fn accusation(msg: SubmitAccusationMsg) -> Result<AccusationClaim, InputError> {
    let ok = |s: &str| {
        let len = s.trim().chars().count();
        len > 0 && len <= MAX_ACCUSATION_FIELD_CHARS && !s.chars().any(char::is_control)
    };
    if !(ok(&msg.murderer) && ok(&msg.motive) && ok(&msg.method)) {
        return Err(InputError::InvalidAccusation);
    }
    Ok(AccusationClaim {
        murderer: msg.murderer.trim().to_string(),
        motive: msg.motive.trim().to_string(),
        method: msg.method.trim().to_string(),
    })
}

/// Version 0 means "unspecified" and is accepted.
pub fn protocol_version(client: u8) -> Result<(), InputError> {
    if client != 0 && client != PROTOCOL_VERSION {
        return Err(InputError::ProtocolMismatch { client });
    }
    Ok(())
}
