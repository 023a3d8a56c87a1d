//! `/clearchat`, `/stats`, `/legal` and `/rules`.

use super::{Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::duration::{format_duration_ms, format_timestamp};
use crate::error::CommandError;
use async_trait::async_trait;
use tracing::info;

const CLEAR_LINES: usize = 100;
const TOP_LIMIT: i64 = 10;

pub fn register(registry: &mut CommandRegistry) {
    registry.register(ClearChatCommand);
    registry.register(StatsCommand);
    registry.register(LegalCommand);
    registry.register(RulesCommand);
}

/// Pushes the chat history of every local player off screen.
pub struct ClearChatCommand;

#[async_trait]
impl Command for ClearChatCommand {
    fn name(&self) -> &'static str {
        "clearchat"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["cc"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.clearchat")
    }

    fn usage(&self) -> &'static str {
        "/clearchat"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let players = ctx.host.online_players().await;
        for _ in 0..CLEAR_LINES {
            for player in &players {
                // Players leaving mid-way are not an error.
                let _ = ctx.host.send_message(player.id, "").await;
            }
        }
        let done = ctx.messages.render("clearchat-done", &[("player", inv.sender())]);
        ctx.host.broadcast(&done, None).await;
        info!("🧹 {} cleared the chat for {} players", inv.sender(), players.len());
        Ok(())
    }
}

/// `/stats` for yourself, `/stats <player>` for someone else and
/// `/stats top` for the playtime leaderboard.
pub struct StatsCommand;

#[async_trait]
impl Command for StatsCommand {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["playtime"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.stats")
    }

    fn usage(&self) -> &'static str {
        "/stats [player|top]"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let name = match inv.arg(0) {
            Some(arg) if arg.eq_ignore_ascii_case("top") => {
                let top = ctx.stats.top_playtime(TOP_LIMIT).await?;
                for (rank, stats) in top.iter().enumerate() {
                    let line = ctx.messages.raw(
                        "stats-top-entry",
                        &[
                            ("rank", &(rank + 1).to_string()),
                            ("player", &stats.last_name),
                            ("playtime", &format_duration_ms(stats.playtime_ms)),
                        ],
                    );
                    ctx.reply_raw(&inv.source, &line).await;
                }
                return Ok(());
            }
            Some(name) => name.to_string(),
            None => inv.player()?.name.clone(),
        };

        match ctx.stats.stats(&name).await? {
            Some(stats) => {
                ctx.reply(
                    &inv.source,
                    "stats-result",
                    &[
                        ("player", &stats.last_name),
                        ("first_join", &format_timestamp(stats.first_join)),
                        ("last_join", &format_timestamp(stats.last_join)),
                        ("joins", &stats.join_count.to_string()),
                        ("playtime", &format_duration_ms(stats.playtime_ms)),
                    ],
                )
                .await
            }
            None => ctx.reply(&inv.source, "stats-none", &[("player", &name)]).await,
        }
        Ok(())
    }
}

async fn show_document(ctx: &ModerationContext, inv: &Invocation, name: &str) {
    match ctx.legal.document(name).await {
        Some(lines) => {
            for line in lines {
                ctx.reply_raw(&inv.source, &line).await;
            }
        }
        None => {
            let documents = ctx.legal.names().await.join(", ");
            ctx.reply(&inv.source, "legal-unknown", &[("documents", &documents)])
                .await;
        }
    }
}

pub struct LegalCommand;

#[async_trait]
impl Command for LegalCommand {
    fn name(&self) -> &'static str {
        "legal"
    }

    fn permission(&self) -> Option<&'static str> {
        None
    }

    fn usage(&self) -> &'static str {
        "/legal <document>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        show_document(ctx, inv, inv.require(0)?).await;
        Ok(())
    }
}

pub struct RulesCommand;

#[async_trait]
impl Command for RulesCommand {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn permission(&self) -> Option<&'static str> {
        None
    }

    fn usage(&self) -> &'static str {
        "/rules"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        show_document(ctx, inv, "rules").await;
        Ok(())
    }
}
