//! Cross-boundary contracts for the assassin game core, API, and persistence.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Start is refused below this count; the ring degenerates otherwise.
pub const MIN_PLAYERS: usize = 4;
pub const MAX_PLAYERS: usize = 50;
pub const DEFAULT_TEST_PLAYERS: usize = 6;

/// Eliminations are disallowed here; rejected from the active location pool.
pub const SAFE_ZONE: &str = "the smoking room";

pub const DEFAULT_WEAPONS: &[&str] = &[
    "a rubber spatula",
    "a party balloon",
    "a rolled-up newspaper",
    "a plastic fork",
    "a squeaky hammer",
    "a feather duster",
];

pub const DEFAULT_LOCATIONS: &[&str] = &[
    "the kitchen",
    "the balcony",
    "the dance floor",
    "the hallway",
    "the garden bench",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Registration,
    Running,
    Finished,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "registration" => Some(Self::Registration),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Registration | Self::Running)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    pub game_id: i64,
    pub status: GameStatus,
    pub test_mode: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub winner_player_id: Option<i64>,
    pub chat_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    pub player_id: i64,
    pub game_id: i64,
    /// External messaging account; `None` marks a virtual rehearsal player.
    pub account_id: Option<i64>,
    pub virtual_player: bool,
    pub display_name: String,
    pub mention: String,
    pub alive: bool,
    pub registered_at: DateTime<Utc>,
    pub died_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractRecord {
    pub contract_id: i64,
    pub game_id: i64,
    pub assassin_player_id: i64,
    pub target_player_id: i64,
    pub weapon: String,
    pub location: String,
    pub assigned_at: DateTime<Utc>,
    pub active: bool,
}

/// Kill log entry joined with player display data, ready for formatting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KillView {
    pub kill_id: i64,
    pub killer_player_id: i64,
    pub killer_name: String,
    pub killer_mention: String,
    pub victim_name: String,
    pub victim_mention: String,
    pub weapon: String,
    pub location: String,
    pub recorded_at: DateTime<Utc>,
}

/// What a player sees when asked for their current assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractView {
    pub target_name: String,
    pub target_mention: String,
    pub weapon: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractRole {
    Assassin,
    Target,
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assassin => f.write_str("assassin"),
            Self::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameError {
    NoActiveGame,
    GameNotRunning,
    AlreadyRunning,
    RegistrationClosed,
    BelowMinimumPlayers { registered: usize, minimum: usize },
    NoWeaponsConfigured,
    NoLocationsConfigured,
    PlayerNotFound,
    AlreadyRegistered,
    NotInGame,
    AlreadyDead,
    NoPendingConfirmation,
    ContractMissing { game_id: i64, player_id: i64, role: ContractRole },
    TestModeOnly,
    Storage(String),
}

impl GameError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoActiveGame => ErrorCode::NoActiveGame,
            Self::GameNotRunning => ErrorCode::GameNotRunning,
            Self::AlreadyRunning => ErrorCode::AlreadyRunning,
            Self::RegistrationClosed => ErrorCode::RegistrationClosed,
            Self::BelowMinimumPlayers { .. } => ErrorCode::BelowMinimumPlayers,
            Self::NoWeaponsConfigured => ErrorCode::NoWeaponsConfigured,
            Self::NoLocationsConfigured => ErrorCode::NoLocationsConfigured,
            Self::PlayerNotFound => ErrorCode::PlayerNotFound,
            Self::AlreadyRegistered => ErrorCode::AlreadyRegistered,
            Self::NotInGame => ErrorCode::NotInGame,
            Self::AlreadyDead => ErrorCode::AlreadyDead,
            Self::NoPendingConfirmation => ErrorCode::NoPendingConfirmation,
            Self::ContractMissing { .. } => ErrorCode::ContractMissing,
            Self::TestModeOnly => ErrorCode::InvalidRequest,
            Self::Storage(_) => ErrorCode::StorageUnavailable,
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveGame => write!(f, "no active game"),
            Self::GameNotRunning => write!(f, "game is not running"),
            Self::AlreadyRunning => write!(f, "a game is already in registration or running"),
            Self::RegistrationClosed => write!(f, "registration is closed"),
            Self::BelowMinimumPlayers { registered, minimum } => write!(
                f,
                "not enough players: {registered} registered, {minimum} required"
            ),
            Self::NoWeaponsConfigured => write!(f, "no weapons configured"),
            Self::NoLocationsConfigured => write!(f, "no locations configured"),
            Self::PlayerNotFound => write!(f, "player not found"),
            Self::AlreadyRegistered => write!(f, "player is already registered"),
            Self::NotInGame => write!(f, "player is not in the game"),
            Self::AlreadyDead => write!(f, "player is already dead"),
            Self::NoPendingConfirmation => write!(f, "no pending death confirmation"),
            Self::ContractMissing {
                game_id,
                player_id,
                role,
            } => write!(
                f,
                "no active contract with player {player_id} as {role} in game {game_id}"
            ),
            Self::TestModeOnly => write!(f, "only available in a test game"),
            Self::Storage(detail) => write!(f, "storage unavailable: {detail}"),
        }
    }
}

impl std::error::Error for GameError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoActiveGame,
    GameNotRunning,
    AlreadyRunning,
    RegistrationClosed,
    BelowMinimumPlayers,
    NoWeaponsConfigured,
    NoLocationsConfigured,
    PlayerNotFound,
    AlreadyRegistered,
    NotInGame,
    AlreadyDead,
    NoPendingConfirmation,
    ContractMissing,
    StorageUnavailable,
    InvalidRequest,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }

    pub fn from_game_error(error: &GameError) -> Self {
        let details = match error {
            GameError::BelowMinimumPlayers { registered, minimum } => {
                Some(format!("registered={registered} minimum={minimum}"))
            }
            GameError::ContractMissing {
                game_id,
                player_id,
                role,
            } => Some(format!("game_id={game_id} player_id={player_id} role={role}")),
            GameError::Storage(detail) => Some(detail.clone()),
            _ => None,
        };
        Self::new(error.error_code(), error.to_string(), details)
    }
}
