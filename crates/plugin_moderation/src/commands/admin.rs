//! `/whitelist`, `/maintenance` and `/wardenreload`.

use super::{duration_arg, Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::duration::format_duration;
use crate::error::{CommandError, ModerationError};
use crate::services::punishments::is_valid_name;
use async_trait::async_trait;

pub fn register(registry: &mut CommandRegistry) {
    registry.register(WhitelistCommand);
    registry.register(MaintenanceCommand);
    registry.register(ReloadCommand);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

pub struct WhitelistCommand;

#[async_trait]
impl Command for WhitelistCommand {
    fn name(&self) -> &'static str {
        "whitelist"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.whitelist")
    }

    fn usage(&self) -> &'static str {
        "/whitelist <on|off|add|remove|list> [player]"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let sub = inv.require(0)?.to_lowercase();
        match sub.as_str() {
            "on" | "off" => {
                let enabled = sub == "on";
                ctx.whitelist.set_enabled(enabled, inv.sender()).await;
                ctx.reply(&inv.source, "whitelist-toggled", &[("state", on_off(enabled))])
                    .await;
            }
            "add" => {
                let player = inv.require(1)?;
                if !is_valid_name(player) {
                    return Err(ModerationError::PlayerNotFound(player.to_string()).into());
                }
                let key = match ctx.whitelist.add(player, inv.sender()).await? {
                    true => "whitelist-added",
                    false => "whitelist-already",
                };
                ctx.reply(&inv.source, key, &[("player", player)]).await;
            }
            "remove" => {
                let player = inv.require(1)?;
                let key = match ctx.whitelist.remove(player).await? {
                    true => "whitelist-removed",
                    false => "whitelist-not-listed",
                };
                ctx.reply(&inv.source, key, &[("player", player)]).await;
            }
            "list" => {
                let entries = ctx.whitelist.list().await?;
                let players = entries
                    .iter()
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.reply(
                    &inv.source,
                    "whitelist-list",
                    &[
                        ("count", &entries.len().to_string()),
                        ("state", on_off(ctx.whitelist.is_enabled())),
                        ("players", &players),
                    ],
                )
                .await;
            }
            _ => return Err(inv.usage_error()),
        }
        Ok(())
    }
}

pub struct MaintenanceCommand;

#[async_trait]
impl Command for MaintenanceCommand {
    fn name(&self) -> &'static str {
        "maintenance"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.maintenance")
    }

    fn usage(&self) -> &'static str {
        "/maintenance <on|off|schedule <duration>|cancel|status>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let sub = inv.require(0)?.to_lowercase();
        match sub.as_str() {
            "on" => {
                ctx.maintenance.enable(inv.sender()).await;
                ctx.reply(&inv.source, "maintenance-toggled", &[("state", "enabled")]).await;
            }
            "off" => {
                ctx.maintenance.disable(inv.sender()).await;
                ctx.reply(&inv.source, "maintenance-toggled", &[("state", "disabled")]).await;
            }
            "schedule" => {
                let input = inv.require(1)?;
                let Some(delay) = duration_arg(input)? else {
                    return Err(CommandError::InvalidDuration {
                        input: input.to_string(),
                        reason: "a delay is required".to_string(),
                    });
                };
                ctx.maintenance.schedule(delay, inv.sender()).await;
                ctx.reply(&inv.source, "maintenance-scheduled", &[("time", &format_duration(delay))])
                    .await;
            }
            "cancel" => {
                let key = match ctx.maintenance.cancel_schedule().await {
                    true => "maintenance-cancelled",
                    false => "maintenance-not-scheduled",
                };
                ctx.reply(&inv.source, key, &[]).await;
            }
            "status" => {
                let scheduled = match ctx.maintenance.scheduled_in().await {
                    Some(left) => format!("Starts in {}.", format_duration(left)),
                    None => String::new(),
                };
                ctx.reply(
                    &inv.source,
                    "maintenance-status",
                    &[("state", on_off(ctx.maintenance.is_enabled())), ("scheduled", &scheduled)],
                )
                .await;
            }
            _ => return Err(inv.usage_error()),
        }
        Ok(())
    }
}

pub struct ReloadCommand;

#[async_trait]
impl Command for ReloadCommand {
    fn name(&self) -> &'static str {
        "wardenreload"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.reload")
    }

    fn usage(&self) -> &'static str {
        "/wardenreload"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        ctx.reload().await?;
        ctx.reply(&inv.source, "reload-done", &[]).await;
        Ok(())
    }
}
