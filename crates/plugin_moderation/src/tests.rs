use super::*;
use crate::config::{EscalationAction, EscalationRule, FilterMode, MaintenanceSettings};
use crate::services::motd::INCOMPATIBLE_PROTOCOL;
use std::collections::BTreeMap;
use warden_event_system::{
    create_warden_event_system, ChatEvent, CommandExecuteEvent, DisconnectEvent, KickedFromServerEvent,
    LocalProxy, LoginEvent, PlayerId, PlayerInfo, PostLoginEvent, ProxyPingEvent, ServerPing, CONSOLE_NAME,
    ServerPreConnectEvent,
};
use warden_storage::{DatabaseManager, DatabaseSettings};

struct Harness {
    host: Arc<LocalProxy>,
    events: Arc<EventSystem>,
    plugin: ModerationPlugin,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(ModerationConfig::default()).await
    }

    async fn with_config(config: ModerationConfig) -> Self {
        let host = Arc::new(LocalProxy::new(
            "proxy-1",
            vec!["lobby".to_string(), "survival".to_string(), "staff".to_string()],
        ));
        let dyn_host: Arc<dyn ProxyHost> = host.clone();
        let db = DatabaseManager::connect(&DatabaseSettings::in_memory()).await.unwrap();
        let cross = warden_cross_proxy::CrossProxyService::disabled(Arc::clone(&dyn_host));
        let ctx = ModerationContext::new(&config, db, Arc::clone(&dyn_host), cross, None).unwrap();

        let plugin = ModerationPlugin::new(ctx);
        let events = create_warden_event_system();
        plugin.register_handlers(Arc::clone(&events)).await.unwrap();
        plugin.on_init(dyn_host).await.unwrap();
        Self { host, events, plugin }
    }

    fn ctx(&self) -> &ModerationContext {
        self.plugin.context()
    }

    /// Runs the login sequence. Returns the player if the login was allowed.
    async fn login(&self, name: &str) -> Result<PlayerInfo, String> {
        let player = PlayerInfo::new(PlayerId::new(), name).with_server("lobby");
        let mut login = LoginEvent::new(player.clone());
        self.events.emit(&mut login).await.unwrap();
        if let Some(reason) = login.denial_reason() {
            return Err(reason.to_string());
        }
        self.host.join(player.clone());
        let mut post = PostLoginEvent { player: player.clone() };
        self.events.emit(&mut post).await.unwrap();
        Ok(player)
    }

    async fn chat(&self, player: &PlayerInfo, message: &str) -> ChatEvent {
        let mut event = ChatEvent::new(player.clone(), message);
        self.events.emit(&mut event).await.unwrap();
        event
    }

    async fn command(&self, player: &PlayerInfo, line: &str) -> CommandExecuteEvent {
        let mut event = CommandExecuteEvent::new(player.clone(), line);
        self.events.emit(&mut event).await.unwrap();
        event
    }

    async fn console(&self, line: &str) {
        assert!(self.plugin.dispatch_console(line).await, "unknown command: {line}");
    }

    fn last_console(&self) -> String {
        self.host.console_messages().last().cloned().unwrap_or_default()
    }
}

#[tokio::test]
async fn test_banned_player_cannot_log_in() {
    let h = Harness::new().await;
    h.console("ban Griefer x-ray client").await;

    let denied = h.login("griefer").await.unwrap_err();
    assert!(denied.contains("x-ray client"));
    assert!(denied.contains("never"));

    h.console("unban Griefer").await;
    assert!(h.login("Griefer").await.is_ok());
}

#[tokio::test]
async fn test_tempban_disconnects_online_player() {
    let h = Harness::new().await;
    let alex = h.login("Alex").await.unwrap();

    h.console("tempban Alex 1h spamming").await;

    let disconnects = h.host.disconnections();
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].0, alex.id);
    assert!(disconnects[0].1.contains("spamming"));
    assert!(h.ctx().punishments.is_banned("alex").await.unwrap());

    h.console("ban Alex again").await;
    assert!(h.last_console().contains("already banned"));
}

#[tokio::test]
async fn test_ban_of_offline_player_notifies_staff() {
    let h = Harness::new().await;
    let ban = h.ctx().punishments.ban("Herobrine", CONSOLE_NAME, Some("x"), None).await.unwrap();
    assert!(ban.id > 0);
    assert!(ban.active);

    let console = h.host.console_messages();
    assert!(console.iter().any(|line| line.contains("Herobrine") && line.contains("banned")));
    assert!(!console.iter().any(|line| line.contains("Something went wrong")));
}

#[tokio::test]
async fn test_concurrent_bans_record_once() {
    let h = Harness::new().await;
    let punishments = &h.ctx().punishments;
    let (first, second) = tokio::join!(
        punishments.ban("Herobrine", CONSOLE_NAME, Some("one"), None),
        punishments.ban("Herobrine", "Admin", Some("two"), None),
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert!(matches!(
        first.err().or(second.err()),
        Some(ModerationError::AlreadyPunished { .. })
    ));
}

#[tokio::test]
async fn test_overlong_tempban_is_rejected() {
    let h = Harness::new().await;
    h.login("Alex").await.unwrap();

    h.console("tempban Alex 999999999y forever").await;
    assert!(h.last_console().contains("not a valid duration"));
    assert!(h.host.disconnections().is_empty());
    assert!(!h.ctx().punishments.is_banned("alex").await.unwrap());
}

#[tokio::test]
async fn test_muted_player_cannot_chat_or_whisper() {
    let h = Harness::new().await;
    let steve = h.login("Steve").await.unwrap();
    h.console("mute Steve caps").await;

    let chat = h.chat(&steve, "hello").await;
    assert!(chat.cancelled);
    let whisper = h.command(&steve, "/msg Alex hi").await;
    assert!(whisper.cancelled);

    let messages = h.host.messages_for(steve.id);
    assert!(messages.iter().any(|m| m.contains("You are muted")));
    assert!(messages.iter().any(|m| m.contains("/msg")));

    h.console("unmute Steve").await;
    assert!(!h.chat(&steve, "hello again").await.cancelled);
}

#[tokio::test]
async fn test_chat_filter_replaces_words() {
    let mut config = ModerationConfig::default();
    config.chat_filter.enabled = true;
    config.chat_filter.mode = FilterMode::Replace;
    config.chat_filter.words = vec!["noob".to_string()];
    let h = Harness::with_config(config).await;
    let alex = h.login("Alex").await.unwrap();

    let chat = h.chat(&alex, "you NOOB!").await;
    assert!(!chat.cancelled);
    assert_eq!(chat.message, format!("you {}!", "****"));

    h.host.grant(alex.id, "warden.chatfilter.bypass");
    assert_eq!(h.chat(&alex, "noob").await.message, "noob");
}

#[tokio::test]
async fn test_spam_is_throttled() {
    let mut config = ModerationConfig::default();
    config.spam.max_messages = 2;
    let h = Harness::with_config(config).await;
    let alex = h.login("Alex").await.unwrap();

    assert!(!h.chat(&alex, "one").await.cancelled);
    assert!(!h.chat(&alex, "two").await.cancelled);
    assert!(h.chat(&alex, "three").await.cancelled);
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("Slow down")));
}

#[tokio::test]
async fn test_whitelist_gates_logins() {
    let mut config = ModerationConfig::default();
    config.whitelist.enabled = true;
    let h = Harness::with_config(config).await;

    assert!(h.login("Alex").await.unwrap_err().contains("not whitelisted"));
    h.console("whitelist add Alex").await;
    assert!(h.login("alex").await.is_ok());

    h.console("whitelist list").await;
    assert!(h.last_console().contains("Alex"));

    h.console("whitelist off").await;
    assert!(h.login("Steve").await.is_ok());
}

#[tokio::test]
async fn test_maintenance_kicks_and_changes_ping() {
    let mut config = ModerationConfig::default();
    config.maintenance.bypass_players = vec!["Admin".to_string()];
    let h = Harness::with_config(config).await;
    let admin = h.login("Admin").await.unwrap();
    let alex = h.login("Alex").await.unwrap();

    h.console("maintenance on").await;
    let kicked: Vec<PlayerId> = h.host.disconnections().into_iter().map(|(id, _)| id).collect();
    assert_eq!(kicked, vec![alex.id]);
    assert!(h.host.player_by_id(admin.id).await.is_some());
    assert!(h.login("Steve").await.unwrap_err().contains("maintenance"));

    let mut ping = ProxyPingEvent {
        ping: ServerPing {
            description: "A Minecraft Proxy".to_string(),
            version_name: "Velocity".to_string(),
            protocol: 767,
            online: 1,
            max_players: 500,
            sample: Vec::new(),
        },
    };
    h.events.emit(&mut ping).await.unwrap();
    assert_eq!(ping.ping.protocol, INCOMPATIBLE_PROTOCOL);
    assert_eq!(ping.ping.description, MaintenanceSettings::default().motd);
    // Cross-proxy is disabled, so the host's own count is kept.
    assert_eq!(ping.ping.online, 1);

    h.console("maintenance off").await;
    assert!(h.login("Steve").await.is_ok());
}

#[tokio::test]
async fn test_staff_chat_prefix_reaches_staff_only() {
    let h = Harness::new().await;
    let mod_a = h.login("ModA").await.unwrap();
    let mod_b = h.login("ModB").await.unwrap();
    let player = h.login("Player").await.unwrap();
    h.host.grant(mod_a.id, "warden.staffchat");
    h.host.grant(mod_b.id, "warden.*");

    let chat = h.chat(&mod_a, "#anyone around?").await;
    assert!(chat.cancelled);
    assert!(h.host.messages_for(mod_b.id).iter().any(|m| m.contains("anyone around?")));
    assert!(h.host.messages_for(player.id).is_empty());

    // Without permission the prefix is ordinary chat.
    assert!(!h.chat(&player, "#hashtag").await.cancelled);
}

#[tokio::test]
async fn test_player_commands_check_permissions() {
    let h = Harness::new().await;
    let alex = h.login("Alex").await.unwrap();

    let event = h.command(&alex, "/ban Steve").await;
    assert!(event.cancelled);
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("do not have permission")));
    assert!(!h.ctx().punishments.is_banned("Steve").await.unwrap());

    assert!(!h.command(&alex, "/spawn").await.cancelled);

    h.command(&alex, "/rules").await;
    assert!(h.host.messages_for(alex.id).len() > 1);
}

#[tokio::test]
async fn test_private_messages_and_reply() {
    let h = Harness::new().await;
    let alex = h.login("Alex").await.unwrap();
    let steve = h.login("Steve").await.unwrap();
    h.host.grant(alex.id, "warden.msg");
    h.host.grant(steve.id, "warden.msg");

    h.command(&alex, "/tell steve hello there").await;
    assert!(h.host.messages_for(steve.id).iter().any(|m| m.contains("[Alex -> me] &fhello there")));

    h.command(&steve, "/r hi!").await;
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("[Steve -> me] &fhi!")));

    h.command(&alex, "/msg Nobody hey").await;
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("Nobody is not online")));
}

#[tokio::test]
async fn test_server_guard_and_lobby_fallback() {
    let mut config = ModerationConfig::default();
    config.server_guard.rules = BTreeMap::from([("staff".to_string(), "warden.server.staff".to_string())]);
    let h = Harness::with_config(config).await;
    let alex = h.login("Alex").await.unwrap();

    let mut connect = ServerPreConnectEvent::new(alex.clone(), "staff");
    h.events.emit(&mut connect).await.unwrap();
    assert!(matches!(connect.result, warden_event_system::ServerConnectResult::Denied { .. }));

    let mut kicked = KickedFromServerEvent {
        player: alex.clone(),
        server: "survival".to_string(),
        reason: Some("Server restarting".to_string()),
        redirect: None,
    };
    h.events.emit(&mut kicked).await.unwrap();
    assert_eq!(kicked.redirect.as_deref(), Some("lobby"));

    let mut from_lobby = KickedFromServerEvent {
        player: alex,
        server: "lobby".to_string(),
        reason: None,
        redirect: None,
    };
    h.events.emit(&mut from_lobby).await.unwrap();
    assert!(from_lobby.redirect.is_none());
}

#[tokio::test]
async fn test_warn_escalates_to_mute() {
    let mut config = ModerationConfig::default();
    config.moderation.warn_escalation = vec![EscalationRule {
        warns: 2,
        action: EscalationAction::Mute,
        duration: Some("1h".to_string()),
        reason: None,
    }];
    let h = Harness::with_config(config).await;
    h.login("Alex").await.unwrap();

    h.console("warn Alex language").await;
    assert!(!h.ctx().punishments.is_muted("Alex").await.unwrap());
    h.console("warn Alex language again").await;
    assert!(h.ctx().punishments.is_muted("Alex").await.unwrap());

    h.console("check Alex").await;
    assert!(h.last_console().contains("muted &fyes"));

    h.console("unwarn Alex").await;
    assert!(h.last_console().contains("Cleared 2 warnings"));
}

#[tokio::test]
async fn test_report_lifecycle() {
    let h = Harness::new().await;
    let alex = h.login("Alex").await.unwrap();
    h.host.grant(alex.id, "warden.report");

    h.command(&alex, "/report Alex myself").await;
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("cannot report yourself")));

    h.command(&alex, "/report Griefer flying").await;
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("Report #1")));
    assert!(h.host.console_messages().iter().any(|m| m.contains("flying")));

    h.command(&alex, "/report Other speed").await;
    assert!(h.host.messages_for(alex.id).iter().any(|m| m.contains("Please wait")));

    h.console("reports").await;
    assert!(h.last_console().contains("Griefer"));
    h.console("reports close 1 handled").await;
    assert!(h.last_console().contains("Report #1 closed"));
    h.console("reports close 1").await;
    assert!(h.last_console().contains("already closed"));
}

#[tokio::test]
async fn test_stats_recorded_across_session() {
    let h = Harness::new().await;
    let alex = h.login("Alex").await.unwrap();

    let mut quit = DisconnectEvent { player: alex.clone() };
    h.host.leave(alex.id);
    h.events.emit(&mut quit).await.unwrap();
    assert!(h.ctx().cross.find("Alex").is_none());

    h.console("stats Alex").await;
    assert!(h.last_console().contains("joins &f1"));
    h.console("stats Nobody").await;
    assert!(h.last_console().contains("never joined"));
}

#[tokio::test]
async fn test_reload_without_source_reports_failure() {
    let h = Harness::new().await;
    h.console("wardenreload").await;
    assert!(h.last_console().contains("Reload failed"));
}

#[tokio::test]
async fn test_console_usage_errors() {
    let h = Harness::new().await;
    h.console("tempban Alex").await;
    assert!(h.last_console().contains("/tempban <player> <duration> [reason]"));
    h.console("tempban Alex soon").await;
    assert!(h.last_console().contains("not a valid duration"));
    h.console("report Alex hacking").await;
    assert!(h.last_console().contains("Only players"));
    assert!(!h.plugin.dispatch_console("nosuchcommand").await);
}

#[tokio::test]
async fn test_shutdown_flushes_sessions() {
    let h = Harness::new().await;
    h.login("Alex").await.unwrap();
    h.plugin.on_shutdown().await.unwrap();
    let stats = h.ctx().stats.stats("Alex").await.unwrap().unwrap();
    assert!(stats.playtime_ms >= 0);
}
