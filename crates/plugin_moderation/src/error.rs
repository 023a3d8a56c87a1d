use thiserror::Error;
use warden_cross_proxy::CrossProxyError;
use warden_event_system::HostError;
use warden_storage::{PunishmentType, StorageError};

#[derive(Error, Debug)]
pub enum ModerationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    CrossProxy(#[from] CrossProxyError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("{player} already has an active {kind}")]
    AlreadyPunished { player: String, kind: PunishmentType },

    #[error("{player} has no active {kind}")]
    NotPunished { player: String, kind: PunishmentType },

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Players cannot report themselves")]
    SelfReport,

    #[error("Report cooldown active for another {remaining_ms}ms")]
    ReportCooldown { remaining_ms: i64 },

    #[error("Reporter already has {limit} open reports")]
    TooManyOpenReports { limit: i64 },

    #[error("Report #{0} does not exist or is already closed")]
    ReportNotOpen(i64),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failures of a single command invocation. Rendered to the sender through
/// the message templates.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("missing permission {0}")]
    NoPermission(&'static str),

    #[error("command is only available to players")]
    PlayerOnly,

    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error(transparent)]
    Moderation(#[from] ModerationError),
}

impl From<StorageError> for CommandError {
    fn from(error: StorageError) -> Self {
        CommandError::Moderation(error.into())
    }
}

impl From<CrossProxyError> for CommandError {
    fn from(error: CrossProxyError) -> Self {
        match error {
            CrossProxyError::PlayerNotFound(name) => ModerationError::PlayerNotFound(name).into(),
            other => CommandError::Moderation(other.into()),
        }
    }
}

impl From<HostError> for CommandError {
    fn from(error: HostError) -> Self {
        match error {
            HostError::PlayerNotConnected(name) => ModerationError::PlayerNotFound(name).into(),
            other => CommandError::Moderation(other.into()),
        }
    }
}
