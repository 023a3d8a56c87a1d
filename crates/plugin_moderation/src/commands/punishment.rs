//! `/ban`, `/tempban`, `/mute`, `/tempmute`, `/unban`, `/unmute`, `/warn`,
//! `/unwarn`, `/kick`, `/history` and `/check`.

use super::{duration_arg, state, Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::duration::format_timestamp;
use crate::error::CommandError;
use crate::services::punishments::describe_length;
use async_trait::async_trait;
use warden_event_system::current_timestamp_millis;
use warden_storage::{Punishment, PunishmentType};

pub fn register(registry: &mut CommandRegistry) {
    registry.register(PunishCommand::ban());
    registry.register(PunishCommand::tempban());
    registry.register(PunishCommand::mute());
    registry.register(PunishCommand::tempmute());
    registry.register(LiftCommand::unban());
    registry.register(LiftCommand::unmute());
    registry.register(WarnCommand);
    registry.register(UnwarnCommand);
    registry.register(KickCommand);
    registry.register(HistoryCommand);
    registry.register(CheckCommand);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sanction {
    Ban,
    Mute,
}

async fn reply_success(ctx: &ModerationContext, inv: &Invocation, punishment: &Punishment) {
    let length = describe_length(punishment, current_timestamp_millis());
    ctx.reply(
        &inv.source,
        "punish-success",
        &[
            ("player", &punishment.player_name),
            ("action", state(punishment.kind)),
            ("reason", &punishment.reason),
            ("duration", &length),
        ],
    )
    .await;
}

/// Ban or mute, permanent or timed.
pub struct PunishCommand {
    name: &'static str,
    permission: &'static str,
    usage: &'static str,
    sanction: Sanction,
    timed: bool,
}

impl PunishCommand {
    pub fn ban() -> Self {
        Self {
            name: "ban",
            permission: "warden.ban",
            usage: "/ban <player> [reason]",
            sanction: Sanction::Ban,
            timed: false,
        }
    }

    pub fn tempban() -> Self {
        Self {
            name: "tempban",
            permission: "warden.tempban",
            usage: "/tempban <player> <duration> [reason]",
            sanction: Sanction::Ban,
            timed: true,
        }
    }

    pub fn mute() -> Self {
        Self {
            name: "mute",
            permission: "warden.mute",
            usage: "/mute <player> [reason]",
            sanction: Sanction::Mute,
            timed: false,
        }
    }

    pub fn tempmute() -> Self {
        Self {
            name: "tempmute",
            permission: "warden.tempmute",
            usage: "/tempmute <player> <duration> [reason]",
            sanction: Sanction::Mute,
            timed: true,
        }
    }
}

#[async_trait]
impl Command for PunishCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn permission(&self) -> Option<&'static str> {
        Some(self.permission)
    }

    fn usage(&self) -> &'static str {
        self.usage
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let (duration, reason) = if self.timed {
            (duration_arg(inv.require(1)?)?, inv.rest(2))
        } else {
            (None, inv.rest(1))
        };

        let punishment = match self.sanction {
            Sanction::Ban => {
                ctx.punishments
                    .ban(target, inv.sender(), reason.as_deref(), duration)
                    .await?
            }
            Sanction::Mute => {
                ctx.punishments
                    .mute(target, inv.sender(), reason.as_deref(), duration)
                    .await?
            }
        };
        reply_success(ctx, inv, &punishment).await;
        Ok(())
    }
}

pub struct LiftCommand {
    name: &'static str,
    permission: &'static str,
    usage: &'static str,
    sanction: Sanction,
}

impl LiftCommand {
    pub fn unban() -> Self {
        Self {
            name: "unban",
            permission: "warden.unban",
            usage: "/unban <player> [reason]",
            sanction: Sanction::Ban,
        }
    }

    pub fn unmute() -> Self {
        Self {
            name: "unmute",
            permission: "warden.unmute",
            usage: "/unmute <player> [reason]",
            sanction: Sanction::Mute,
        }
    }
}

#[async_trait]
impl Command for LiftCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn permission(&self) -> Option<&'static str> {
        Some(self.permission)
    }

    fn usage(&self) -> &'static str {
        self.usage
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let reason = inv.rest(1);
        let action = match self.sanction {
            Sanction::Ban => {
                ctx.punishments.unban(target, inv.sender(), reason.as_deref()).await?;
                "unbanned"
            }
            Sanction::Mute => {
                ctx.punishments.unmute(target, inv.sender(), reason.as_deref()).await?;
                "unmuted"
            }
        };
        ctx.reply(&inv.source, "unpunish-success", &[("player", target), ("action", action)])
            .await;
        Ok(())
    }
}

pub struct WarnCommand;

#[async_trait]
impl Command for WarnCommand {
    fn name(&self) -> &'static str {
        "warn"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.warn")
    }

    fn usage(&self) -> &'static str {
        "/warn <player> <reason>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let reason = inv.require_rest(1)?;
        let outcome = ctx.punishments.warn(target, inv.sender(), &reason).await?;
        reply_success(ctx, inv, &outcome.warning).await;
        if let Some(escalation) = &outcome.escalation {
            reply_success(ctx, inv, escalation).await;
        }
        Ok(())
    }
}

pub struct UnwarnCommand;

#[async_trait]
impl Command for UnwarnCommand {
    fn name(&self) -> &'static str {
        "unwarn"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.unwarn")
    }

    fn usage(&self) -> &'static str {
        "/unwarn <player>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let cleared = ctx.punishments.clear_warns(target, inv.sender()).await?;
        ctx.reply(
            &inv.source,
            "unwarn-success",
            &[("count", &cleared.to_string()), ("player", target)],
        )
        .await;
        Ok(())
    }
}

pub struct KickCommand;

#[async_trait]
impl Command for KickCommand {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.kick")
    }

    fn usage(&self) -> &'static str {
        "/kick <player> [reason]"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let reason = inv.rest(1);
        let kick = ctx.punishments.kick(target, inv.sender(), reason.as_deref()).await?;
        reply_success(ctx, inv, &kick).await;
        Ok(())
    }
}

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.history")
    }

    fn usage(&self) -> &'static str {
        "/history <player>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let limit = ctx.settings.read().await.history_limit;
        let entries = ctx.punishments.history(target, limit).await?;
        if entries.is_empty() {
            ctx.reply(&inv.source, "history-empty", &[("player", target)]).await;
            return Ok(());
        }

        let count = entries.len().to_string();
        ctx.reply(&inv.source, "history-header", &[("player", target), ("count", &count)])
            .await;
        for entry in &entries {
            let line = ctx.messages.raw(
                "history-entry",
                &[
                    ("id", &entry.id.to_string()),
                    ("type", entry.kind.as_str()),
                    ("date", &format_timestamp(entry.start_time)),
                    ("issuer", &entry.issuer),
                    ("reason", &entry.reason),
                    ("status", &status(entry)),
                ],
            );
            ctx.reply_raw(&inv.source, &line).await;
        }
        Ok(())
    }
}

fn status(entry: &Punishment) -> String {
    match (&entry.removed_by, entry.active, entry.kind) {
        (Some(by), _, _) => format!("lifted by {by}"),
        (None, true, _) => "active".to_string(),
        (None, false, PunishmentType::Kick) => "-".to_string(),
        (None, false, _) => "expired".to_string(),
    }
}

pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.check")
    }

    fn usage(&self) -> &'static str {
        "/check <player>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let banned = ctx.punishments.is_banned(target).await?;
        let muted = ctx.punishments.is_muted(target).await?;
        let warns = ctx.punishments.active_warn_count(target).await?;
        ctx.reply(
            &inv.source,
            "check-result",
            &[
                ("player", target),
                ("banned", yes_no(banned)),
                ("muted", yes_no(muted)),
                ("warns", &warns.to_string()),
            ],
        )
        .await;
        Ok(())
    }
}
