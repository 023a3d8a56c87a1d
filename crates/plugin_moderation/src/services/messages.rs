//! # Message Templates
//!
//! Every player-facing text goes through [`MessageService`]. Templates are
//! looked up by key, fall back to the built-in defaults below and may be
//! overridden in `[messages]`. Placeholders are `{name}`; `&` colour codes
//! are left for the host to render.

use crate::config::MessageSettings;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

const DEFAULT_PREFIX: &str = "&8[&cWarden&8]&r ";

const DEFAULTS: &[(&str, &str)] = &[
    // General
    ("usage", "&cUsage: &f{usage}"),
    ("no-permission", "&cYou do not have permission to do that."),
    ("player-only", "&cOnly players can use this command."),
    ("player-not-found", "&c{player} is not online."),
    ("invalid-duration", "&c'{input}' is not a valid duration: {reason}"),
    ("internal-error", "&cSomething went wrong, please check the console."),
    // Punishments
    ("ban-screen", "&cYou are banned from this network.\n\n&7Reason: &f{reason}\n&7Expires: &f{expires}\n&7Issued by: &f{issuer}"),
    ("kick-screen", "&cYou were kicked from the network.\n\n&7Reason: &f{reason}"),
    ("mute-notice", "&cYou are muted. &7Reason: &f{reason} &7Remaining: &f{remaining}"),
    ("warn-notice", "&eYou were warned by {issuer}: &f{reason} &7({count} active warnings)"),
    ("unmute-notice", "&aYou are no longer muted."),
    ("already-punished", "&c{player} is already {state}."),
    ("not-punished", "&c{player} is not {state}."),
    ("punish-success", "&a{player} has been {action}: &f{reason} &7({duration})"),
    ("unpunish-success", "&a{player} has been {action}."),
    ("unwarn-success", "&aCleared {count} warnings of {player}."),
    ("staff-punish", "&7[&c{action}&7] &f{player} &7by &f{issuer}&7: &f{reason} &7({duration})"),
    ("staff-unpunish", "&7[&a{action}&7] &f{player} &7by &f{issuer}"),
    ("staff-escalation", "&7[&cAuto&7] &f{player} &7reached {count} warnings: &f{action}"),
    ("broadcast-punish", "&c{player} &7was {action}&7: &f{reason}"),
    ("history-header", "&6Punishment history of {player} &7({count})"),
    ("history-entry", "&7#{id} &f{type} &7{date} by &f{issuer}&7: {reason} &8[{status}]"),
    ("history-empty", "&7{player} has a clean record."),
    ("check-result", "&6{player}&7: banned &f{banned}&7, muted &f{muted}&7, warnings &f{warns}"),
    ("command-blocked-muted", "&cYou cannot use /{command} while muted."),
    // Reports
    ("report-self", "&cYou cannot report yourself."),
    ("report-cooldown", "&cPlease wait {remaining} before reporting again."),
    ("report-limit", "&cYou already have {limit} open reports."),
    ("report-sent", "&aThanks! Report #{id} against {player} was sent to the staff."),
    ("report-notify", "&c[Report #{id}] &f{reporter} &7reported &f{player} &7on {server}: &f{reason}"),
    ("reports-header", "&6{count} open reports"),
    ("reports-entry", "&7#{id} &f{player} &7by {reporter} ({date}): &f{reason}"),
    ("reports-empty", "&aThere are no open reports."),
    ("report-closed", "&aReport #{id} closed."),
    ("report-not-open", "&cReport #{id} does not exist or is already closed."),
    // Whitelist
    ("whitelist-kick", "&cYou are not whitelisted on this network."),
    ("whitelist-toggled", "&aWhitelist {state}."),
    ("whitelist-added", "&aAdded {player} to the whitelist."),
    ("whitelist-already", "&c{player} is already whitelisted."),
    ("whitelist-removed", "&aRemoved {player} from the whitelist."),
    ("whitelist-not-listed", "&c{player} is not whitelisted."),
    ("whitelist-list", "&6Whitelist ({count}, {state}): &f{players}"),
    // Maintenance
    ("maintenance-kick", "&cThe network is under maintenance.\n&7Please check back later."),
    ("maintenance-toggled", "&aMaintenance {state}."),
    ("maintenance-countdown", "&cMaintenance begins in {time}!"),
    ("maintenance-scheduled", "&eMaintenance scheduled in {time}."),
    ("maintenance-cancelled", "&aScheduled maintenance cancelled."),
    ("maintenance-not-scheduled", "&cNo maintenance is scheduled."),
    ("maintenance-status", "&7Maintenance is &f{state}&7. {scheduled}"),
    // Messaging
    ("msg-sent", "&7[me -> {player}] &f{message}"),
    ("msg-received", "&7[{player} -> me] &f{message}"),
    ("msg-self", "&cYou cannot message yourself."),
    ("reply-none", "&cYou have nobody to reply to."),
    ("broadcast-format", "&c[Broadcast] &f{message}"),
    ("staffchat-format", "&b[Staff] &7[{server}] &f{player}&7: &f{message}"),
    ("joinme-format", "&a{player} invites you to &f{server}&a! Use &f/server {server} &ato join."),
    ("joinme-no-server", "&cYou are not connected to a server."),
    ("chat-filtered", "&cYour message contained blocked words."),
    ("spam-throttled", "&cSlow down! You can chat again in {remaining}."),
    ("clearchat-done", "&aThe chat was cleared by {player}."),
    // Network
    ("find-result", "&e{player} &7is on &f{server} &7(proxy {proxy})"),
    ("glist-header", "&6{count} players online across {proxies} proxies"),
    ("glist-entry", "&7[{server}] &f({count}) &7{players}"),
    ("send-success", "&aSent {player} to {server}."),
    ("unknown-server", "&cThere is no server called {server}."),
    ("server-list", "&7Servers: &f{servers}"),
    ("server-connecting", "&aConnecting you to {server}..."),
    ("server-denied", "&cYou may not join {server}."),
    ("lobby-none", "&cNo lobby is available right now."),
    ("lobby-redirect", "&eYou were moved to {server}: &f{reason}"),
    ("ping-result", "&7Proxy &f{proxy}&7: &f{online} &7players here, &f{network} &7on the network."),
    // Info
    ("stats-result", "&6{player}&7: first join &f{first_join}&7, last join &f{last_join}&7, joins &f{joins}&7, playtime &f{playtime}"),
    ("stats-none", "&c{player} has never joined."),
    ("stats-top-entry", "&7{rank}. &f{player} &7{playtime}"),
    ("legal-unknown", "&cUnknown document. Available: &f{documents}"),
    ("reload-done", "&aWarden configuration reloaded."),
    ("reload-failed", "&cReload failed: {reason}"),
];

/// Named text templates with a shared prefix.
#[derive(Debug)]
pub struct MessageService {
    overrides: DashMap<String, String>,
    prefix: RwLock<String>,
}

impl MessageService {
    pub fn new(settings: &MessageSettings) -> Arc<Self> {
        let service = Arc::new(Self {
            overrides: DashMap::new(),
            prefix: RwLock::new(DEFAULT_PREFIX.to_string()),
        });
        service.reload(settings);
        service
    }

    /// Replaces all overrides with `settings`.
    pub fn reload(&self, settings: &MessageSettings) {
        self.overrides.clear();
        for (key, template) in &settings.templates {
            if !DEFAULTS.iter().any(|(known, _)| known == key) {
                warn!("⚠️ Unknown message template '{}' in [messages]", key);
            }
            self.overrides.insert(key.clone(), template.clone());
        }
        let prefix = settings.prefix.clone().unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        match self.prefix.write() {
            Ok(mut guard) => *guard = prefix,
            Err(poisoned) => *poisoned.into_inner() = prefix,
        }
    }

    /// The template text for `key` with placeholders filled, no prefix.
    /// Used for disconnect screens and MOTD-style output.
    pub fn raw(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let template = match self.overrides.get(key) {
            Some(template) => template.clone(),
            None => DEFAULTS
                .iter()
                .find(|(known, _)| *known == key)
                .map(|(_, template)| template.to_string())
                .unwrap_or_else(|| key.to_string()),
        };
        fill(&template, vars)
    }

    /// Prefixed chat message.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> String {
        format!("{}{}", self.prefix(), self.raw(key, vars))
    }

    pub fn prefix(&self) -> String {
        match self.prefix.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Substitutes `{name}` placeholders. Unknown placeholders stay literal.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut output = template.to_string();
    for (name, value) in vars {
        output = output.replace(&format!("{{{name}}}"), value);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_defaults_and_placeholders() {
        let messages = MessageService::new(&MessageSettings::default());
        assert_eq!(
            messages.raw("player-not-found", &[("player", "Steve")]),
            "&cSteve is not online."
        );
        assert!(messages.render("reply-none", &[]).starts_with(DEFAULT_PREFIX));
    }

    #[test]
    fn test_overrides_and_reload() {
        let mut templates = BTreeMap::new();
        templates.insert("reply-none".to_string(), "Nobody, {who}".to_string());
        let settings = MessageSettings {
            prefix: Some("[W] ".to_string()),
            templates,
        };
        let messages = MessageService::new(&settings);
        assert_eq!(messages.render("reply-none", &[("who", "sorry")]), "[W] Nobody, sorry");

        messages.reload(&MessageSettings::default());
        assert_eq!(messages.raw("reply-none", &[]), "&cYou have nobody to reply to.");
        assert_eq!(messages.prefix(), DEFAULT_PREFIX);
    }

    #[test]
    fn test_unknown_key_and_placeholder_stay_literal() {
        let messages = MessageService::new(&MessageSettings::default());
        assert_eq!(messages.raw("no-such-key", &[]), "no-such-key");
        assert_eq!(fill("{a} {b}", &[("a", "1")]), "1 {b}");
    }
}
