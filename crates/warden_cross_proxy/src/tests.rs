use crate::*;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use warden_event_system::{LocalProxy, PlayerId, PlayerInfo};

struct Node {
    host: Arc<LocalProxy>,
    service: Arc<CrossProxyService>,
    inbox: broadcast::Receiver<Envelope>,
    relays: Arc<Recorder>,
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, CrossProxyMessage)>>);

#[async_trait]
impl RelayHandler for Recorder {
    async fn handle_relay(&self, origin: &str, message: &CrossProxyMessage) {
        self.0.lock().unwrap().push((origin.to_string(), message.clone()));
    }
}

async fn node(id: &str, bus: &LocalBus) -> Node {
    let host = Arc::new(LocalProxy::new(id, vec!["lobby".to_string(), "survival".to_string()]));
    let service = CrossProxyService::new(host.clone(), Some(Arc::new(bus.clone())), 30_000);
    let relays = Arc::new(Recorder::default());
    service.set_relay_handler(relays.clone()).await;
    Node {
        host,
        service,
        inbox: bus.subscribe(),
        relays,
    }
}

/// Applies everything queued for a node, as the receiver task would.
async fn pump(node: &mut Node) {
    while let Ok(envelope) = node.inbox.try_recv() {
        node.service.apply(envelope).await;
    }
}

fn player(name: &str) -> PlayerInfo {
    PlayerInfo::new(PlayerId::new(), name)
}

#[tokio::test]
async fn test_presence_follows_join_switch_quit() {
    let bus = LocalBus::new();
    let mut a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    let steve = player("Steve");
    a.host.join(steve.clone());
    a.service.player_joined(&steve).await.unwrap();
    a.service.player_switched(&steve, "survival").await.unwrap();
    pump(&mut b).await;
    pump(&mut a).await;

    let found = b.service.find("steve").unwrap();
    assert_eq!(found.proxy, "proxy-a");
    assert_eq!(found.server.as_deref(), Some("survival"));
    assert_eq!(b.service.global_list()["survival"], vec!["Steve".to_string()]);

    a.service.player_quit(&steve).await.unwrap();
    pump(&mut b).await;
    assert!(b.service.find("Steve").is_none());
}

#[tokio::test]
async fn test_own_envelopes_are_ignored() {
    let bus = LocalBus::new();
    let mut a = node("proxy-a", &bus).await;

    let steve = player("Steve");
    a.service.player_joined(&steve).await.unwrap();
    a.service.player_quit(&steve).await.unwrap();
    // Replaying the join must not resurrect the player.
    pump(&mut a).await;
    assert!(a.service.find("steve").is_none());
}

#[tokio::test]
async fn test_private_message_routing() {
    let bus = LocalBus::new();
    let mut a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    let alex = player("Alex");
    b.host.join(alex.clone());
    b.service.player_joined(&alex).await.unwrap();
    pump(&mut a).await;

    let local = player("Steve");
    a.host.join(local.clone());
    assert_eq!(
        a.service.send_private("Alex", "steve", "hi").await.unwrap(),
        Delivery::Local(local)
    );

    let delivery = a.service.send_private("Steve", "ALEX", "hello").await.unwrap();
    assert_eq!(
        delivery,
        Delivery::Remote {
            proxy: "proxy-b".to_string(),
            name: "Alex".to_string()
        }
    );
    pump(&mut b).await;
    let relays = b.relays.0.lock().unwrap().clone();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].0, "proxy-a");
    assert!(matches!(&relays[0].1, CrossProxyMessage::PrivateMessage { to, .. } if to == "Alex"));

    assert!(matches!(
        a.service.send_private("Steve", "nobody", "?").await,
        Err(CrossProxyError::PlayerNotFound(_))
    ));
}

#[tokio::test]
async fn test_remote_disconnect() {
    let bus = LocalBus::new();
    let mut a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    let griefer = player("Griefer");
    b.host.join(griefer.clone());
    b.service.player_joined(&griefer).await.unwrap();
    pump(&mut a).await;

    a.service.disconnect("griefer", "You are banned").await.unwrap();
    pump(&mut b).await;

    assert_eq!(
        b.host.disconnections(),
        vec![(griefer.id, "You are banned".to_string())]
    );
}

#[tokio::test]
async fn test_broadcast_reaches_every_proxy() {
    let bus = LocalBus::new();
    let a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    let steve = player("Steve");
    let staff = player("Staff");
    a.host.join(steve.clone());
    b.host.join(staff.clone());
    b.host.grant(staff.id, "warden.notify");

    let delivered = a.service.broadcast("&cRestart soon", None).await.unwrap();
    assert_eq!(delivered, 1);
    a.service.broadcast("staff only", Some("warden.notify")).await.unwrap();
    pump(&mut b).await;

    assert_eq!(
        b.host.messages_for(staff.id),
        vec!["&cRestart soon".to_string(), "staff only".to_string()]
    );
    assert_eq!(a.host.messages_for(steve.id), vec!["&cRestart soon".to_string()]);
}

#[tokio::test]
async fn test_relay_is_handled_locally_and_remotely() {
    let bus = LocalBus::new();
    let a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    let message = CrossProxyMessage::StaffChat {
        from: "Mod".to_string(),
        server: Some("lobby".to_string()),
        message: "eyes on Griefer".to_string(),
    };
    a.service.relay(message.clone()).await.unwrap();
    pump(&mut b).await;

    assert_eq!(a.relays.0.lock().unwrap().clone(), vec![("proxy-a".to_string(), message.clone())]);
    assert_eq!(b.relays.0.lock().unwrap().clone(), vec![("proxy-a".to_string(), message)]);
}

#[tokio::test]
async fn test_heartbeat_and_shutdown() {
    let bus = LocalBus::new();
    let a = node("proxy-a", &bus).await;
    let mut b = node("proxy-b", &bus).await;

    a.host.join(player("One"));
    a.host.join(player("Two"));
    a.service.tick_at(1_000).await;
    pump(&mut b).await;

    assert_eq!(b.service.online_count(), 2);
    assert!(b.service.proxies().iter().any(|(id, _)| id == "proxy-a"));

    a.service.shutdown().await;
    pump(&mut b).await;
    assert_eq!(b.service.online_count(), 0);
    assert!(b.service.proxies().iter().all(|(id, _)| id != "proxy-a"));
}

#[tokio::test]
async fn test_disabled_service_tracks_local_players_only() {
    let host = Arc::new(LocalProxy::new("solo", vec!["lobby".to_string()]));
    let service = CrossProxyService::disabled(host.clone());
    assert!(!service.is_enabled());

    let steve = player("Steve");
    host.join(steve.clone());
    service.player_joined(&steve).await.unwrap();
    assert_eq!(service.find("steve").unwrap().proxy, "solo");

    service.tick_at(5).await;
    assert_eq!(service.online_count(), 1);
    assert!(matches!(
        service.disconnect("ghost", "bye").await,
        Err(CrossProxyError::PlayerNotFound(_))
    ));
}
