//! # Commands
//!
//! Every command is a small executor struct implementing [`Command`]. The
//! [`CommandRegistry`] resolves names and aliases case-insensitively,
//! checks the permission node and renders failures through the message
//! templates, so executors only deal with the happy path and `?`.

pub mod admin;
pub mod messaging;
pub mod misc;
pub mod network;
pub mod punishment;
pub mod reports;

use crate::context::ModerationContext;
use crate::duration::{format_duration_ms, parse_duration};
use crate::error::{CommandError, ModerationError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use warden_event_system::{CommandSource, PlayerInfo};
use warden_storage::PunishmentType;

#[async_trait]
pub trait Command: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Node required from players. The console may run everything.
    fn permission(&self) -> Option<&'static str>;

    fn usage(&self) -> &'static str;

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError>;
}

/// A parsed command line together with who typed it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub source: CommandSource,
    pub label: String,
    pub args: Vec<String>,
    usage: &'static str,
}

impl Invocation {
    pub fn parse(source: CommandSource, line: &str, usage: &'static str) -> Option<Self> {
        let mut parts = line.trim().trim_start_matches('/').split_whitespace();
        let label = parts.next()?.to_lowercase();
        Some(Self {
            source,
            label,
            args: parts.map(str::to_string).collect(),
            usage,
        })
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Argument at `index`, or the usage error.
    pub fn require(&self, index: usize) -> Result<&str, CommandError> {
        self.arg(index).ok_or(CommandError::Usage(self.usage))
    }

    /// Arguments from `index` on joined with single spaces.
    pub fn rest(&self, index: usize) -> Option<String> {
        match self.args.get(index..) {
            Some(rest) if !rest.is_empty() => Some(rest.join(" ")),
            _ => None,
        }
    }

    pub fn require_rest(&self, index: usize) -> Result<String, CommandError> {
        self.rest(index).ok_or(CommandError::Usage(self.usage))
    }

    pub fn player(&self) -> Result<&PlayerInfo, CommandError> {
        self.source.player().ok_or(CommandError::PlayerOnly)
    }

    pub fn sender(&self) -> &str {
        self.source.name()
    }

    pub fn usage_error(&self) -> CommandError {
        CommandError::Usage(self.usage)
    }
}

/// Parses a duration argument; `perm` yields `None`.
pub fn duration_arg(input: &str) -> Result<Option<Duration>, CommandError> {
    parse_duration(input).map_err(|reason| CommandError::InvalidDuration {
        input: input.to_string(),
        reason,
    })
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
    lookup: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every Warden command.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        punishment::register(&mut registry);
        reports::register(&mut registry);
        admin::register(&mut registry);
        messaging::register(&mut registry);
        network::register(&mut registry);
        misc::register(&mut registry);
        registry
    }

    /// Adds a command. Later registrations win on name clashes.
    pub fn register(&mut self, command: impl Command) {
        let index = self.commands.len();
        for label in std::iter::once(command.name()).chain(command.aliases().iter().copied()) {
            self.lookup.insert(label.to_lowercase(), index);
        }
        self.commands.push(Arc::new(command));
    }

    pub fn get(&self, label: &str) -> Option<Arc<dyn Command>> {
        let label = label.trim_start_matches('/').to_lowercase();
        self.lookup.get(&label).map(|index| Arc::clone(&self.commands[*index]))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.iter().map(|command| command.name()).collect()
    }

    /// Runs `line` for `source`. Returns `false` if no command matched.
    pub async fn dispatch(&self, ctx: &ModerationContext, source: &CommandSource, line: &str) -> bool {
        let Some(label) = line.trim().trim_start_matches('/').split_whitespace().next() else {
            return false;
        };
        let Some(command) = self.get(label) else {
            return false;
        };
        let Some(inv) = Invocation::parse(source.clone(), line, command.usage()) else {
            return false;
        };

        debug!("{} ran /{}", source.name(), line.trim().trim_start_matches('/'));
        let result = match (source.player(), command.permission()) {
            (Some(player), Some(node)) if !ctx.host.has_permission(player.id, node).await => {
                Err(CommandError::NoPermission(node))
            }
            _ => command.execute(ctx, &inv).await,
        };
        if let Err(e) = result {
            report_error(ctx, source, &inv, e).await;
        }
        true
    }
}

async fn report_error(ctx: &ModerationContext, source: &CommandSource, inv: &Invocation, error: CommandError) {
    match error {
        CommandError::Usage(usage) => ctx.reply(source, "usage", &[("usage", usage)]).await,
        CommandError::NoPermission(_) => ctx.reply(source, "no-permission", &[]).await,
        CommandError::PlayerOnly => ctx.reply(source, "player-only", &[]).await,
        CommandError::InvalidDuration { input, reason } => {
            ctx.reply(source, "invalid-duration", &[("input", &input), ("reason", &reason)])
                .await
        }
        CommandError::Moderation(error) => match error {
            ModerationError::PlayerNotFound(player) => {
                ctx.reply(source, "player-not-found", &[("player", &player)]).await
            }
            ModerationError::AlreadyPunished { player, kind } => {
                ctx.reply(source, "already-punished", &[("player", &player), ("state", state(kind))])
                    .await
            }
            ModerationError::NotPunished { player, kind } => {
                ctx.reply(source, "not-punished", &[("player", &player), ("state", state(kind))])
                    .await
            }
            ModerationError::SelfReport => ctx.reply(source, "report-self", &[]).await,
            ModerationError::ReportCooldown { remaining_ms } => {
                let remaining = format_duration_ms(remaining_ms);
                ctx.reply(source, "report-cooldown", &[("remaining", &remaining)]).await
            }
            ModerationError::TooManyOpenReports { limit } => {
                ctx.reply(source, "report-limit", &[("limit", &limit.to_string())]).await
            }
            ModerationError::ReportNotOpen(id) => {
                ctx.reply(source, "report-not-open", &[("id", &id.to_string())]).await
            }
            ModerationError::Config(reason) => ctx.reply(source, "reload-failed", &[("reason", &reason)]).await,
            other => {
                error!("❌ /{} by {} failed: {}", inv.label, source.name(), other);
                ctx.reply(source, "internal-error", &[]).await
            }
        },
    }
}

/// Past participle used in punishment messages.
pub(crate) fn state(kind: PunishmentType) -> &'static str {
    match kind {
        PunishmentType::Ban => "banned",
        PunishmentType::Mute => "muted",
        PunishmentType::Warn => "warned",
        PunishmentType::Kick => "kicked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_parsing() {
        let inv = Invocation::parse(CommandSource::Console, "/Ban  Griefer  x-ray   hacks", "ban <player>").unwrap();
        assert_eq!(inv.label, "ban");
        assert_eq!(inv.arg(0), Some("Griefer"));
        assert_eq!(inv.rest(1).as_deref(), Some("x-ray hacks"));
        assert_eq!(inv.rest(3), None);
        assert!(matches!(inv.require(5), Err(CommandError::Usage("ban <player>"))));
        assert!(matches!(inv.player(), Err(CommandError::PlayerOnly)));
        assert!(Invocation::parse(CommandSource::Console, "   ", "").is_none());
    }

    #[test]
    fn test_builtin_lookup_by_alias() {
        let registry = CommandRegistry::with_builtin();
        assert_eq!(registry.get("TELL").map(|c| c.name()), Some("msg"));
        assert_eq!(registry.get("/r").map(|c| c.name()), Some("reply"));
        assert_eq!(registry.get("tempban").map(|c| c.permission()), Some(Some("warden.tempban")));
        assert_eq!(registry.get("lobby").map(|c| c.permission()), Some(None));
        assert!(registry.get("gamemode").is_none());
    }

    #[test]
    fn test_duration_arg_errors() {
        assert_eq!(duration_arg("1h").unwrap(), Some(Duration::from_secs(3600)));
        assert_eq!(duration_arg("perm").unwrap(), None);
        assert!(matches!(duration_arg("soon"), Err(CommandError::InvalidDuration { .. })));
    }
}
