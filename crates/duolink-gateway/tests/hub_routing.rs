#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

use duolink_core::{Event, EventKind, UserId};
use duolink_gateway::hub::{Hub, OUTBOUND_QUEUE_CAPACITY};
use duolink_gateway::obs::HubMetrics;

fn new_hub() -> Arc<Hub> {
    Hub::spawn(Arc::new(HubMetrics::default()))
}

fn chat(sender: UserId, receiver: UserId) -> Event {
    Event {
        kind: EventKind::Message,
        sender_id: sender,
        receiver_id: Some(receiver),
        payload: serde_json::value::to_raw_value(&json!({"content": "hi"})).ok(),
        timestamp: None,
    }
}

/// Receive and decode the next frame on a connection's outbound queue.
async fn recv_event(rx: &mut mpsc::Receiver<Message>) -> Event {
    let msg = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("outbound queue closed");
    match msg {
        Message::Text(text) => Event::decode(&text).expect("frame must decode"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

/// Assert no frame arrives for a while.
async fn assert_silent(rx: &mut mpsc::Receiver<Message>) {
    let res = timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(res.is_err(), "unexpected frame: {:?}", res.unwrap());
}

/// Assert the outbound queue is closed (hub dropped its sender).
async fn assert_closed(rx: &mut mpsc::Receiver<Message>) {
    let res = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for queue closure");
    assert!(res.is_none(), "expected closed queue, got {:?}", res.unwrap());
}

fn presence_payload(ev: &Event) -> Value {
    serde_json::from_str(ev.payload.as_ref().expect("presence payload").get()).unwrap()
}

#[tokio::test]
async fn register_broadcasts_online_to_others_only() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    hub.register(a).await;
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;

    // A sees B come online; B receives no presence event for itself.
    let ev = recv_event(&mut a_rx).await;
    assert_eq!(ev.kind, EventKind::Online);
    assert_eq!(ev.sender_id, 2);
    assert_eq!(presence_payload(&ev), json!({"user_id": 2, "is_online": true}));
    assert!(ev.timestamp.is_some());

    assert_silent(&mut b_rx).await;
    assert_silent(&mut a_rx).await;

    assert!(hub.is_online(1));
    assert!(hub.is_online(2));
    let mut online = hub.list_online();
    online.sort_unstable();
    assert_eq!(online, vec![1, 2]);
}

#[tokio::test]
async fn route_delivers_to_receiver_only() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    hub.register(a).await;
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    let (c, mut c_rx) = hub.connect(3, "carol".into());
    hub.register(c).await;

    // drain presence traffic
    let _ = recv_event(&mut a_rx).await; // B online
    let _ = recv_event(&mut a_rx).await; // C online
    let _ = recv_event(&mut b_rx).await; // C online

    hub.route(chat(1, 2)).await;

    let ev = recv_event(&mut b_rx).await;
    assert_eq!(ev.kind, EventKind::Message);
    assert_eq!(ev.sender_id, 1);
    assert_eq!(ev.receiver_id, Some(2));
    let payload: Value = serde_json::from_str(ev.payload.unwrap().get()).unwrap();
    assert_eq!(payload["content"], "hi");

    assert_silent(&mut a_rx).await;
    assert_silent(&mut c_rx).await;
}

#[tokio::test]
async fn route_to_offline_user_is_silently_dropped() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    hub.register(a).await;

    hub.route(chat(1, 99)).await;

    assert_silent(&mut a_rx).await;
    assert!(hub.is_online(1));
    assert!(!hub.is_online(99));
}

#[tokio::test]
async fn unregister_closes_queue_and_broadcasts_offline_once() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    let a_seq = a.conn_seq;
    hub.register(a).await;
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    let _ = recv_event(&mut a_rx).await; // B online

    hub.unregister(1, a_seq).await;

    let ev = recv_event(&mut b_rx).await;
    assert_eq!(ev.kind, EventKind::Offline);
    assert_eq!(ev.sender_id, 1);
    assert_eq!(presence_payload(&ev), json!({"user_id": 1, "is_online": false}));
    assert_silent(&mut b_rx).await;

    assert_closed(&mut a_rx).await;
    assert!(!hub.is_online(1));
    assert!(hub.is_online(2));
}

#[tokio::test]
async fn duplicate_registration_supersedes_older_connection() {
    let hub = new_hub();
    let (a1, mut a1_rx) = hub.connect(1, "alice".into());
    let a1_seq = a1.conn_seq;
    hub.register(a1).await;
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    let _ = recv_event(&mut a1_rx).await; // B online

    // Second connection for the same identity before the first notices.
    let (a2, mut a2_rx) = hub.connect(1, "alice".into());
    hub.register(a2).await;

    // One presence-online per Register call, even while already registered.
    let ev = recv_event(&mut b_rx).await;
    assert_eq!(ev.kind, EventKind::Online);
    assert_eq!(ev.sender_id, 1);
    assert_silent(&mut b_rx).await;

    // The superseded connection's queue is gone; its pumps see the closure.
    assert_closed(&mut a1_rx).await;

    // The old connection's eventual unregister is a no-op.
    hub.unregister(1, a1_seq).await;
    assert_silent(&mut b_rx).await;
    assert!(hub.is_online(1));

    // Routing reaches only the newer connection.
    hub.route(chat(2, 1)).await;
    let ev = recv_event(&mut a2_rx).await;
    assert_eq!(ev.kind, EventKind::Message);
    assert_eq!(ev.sender_id, 2);
}

#[tokio::test]
async fn saturated_receiver_is_force_unregistered() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    hub.register(a).await;
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    let _ = recv_event(&mut a_rx).await; // B online

    // Nobody drains B's queue; fill it, then overflow it.
    for _ in 0..OUTBOUND_QUEUE_CAPACITY {
        hub.route(chat(1, 2)).await;
    }
    hub.route(chat(1, 2)).await;

    // Exactly one presence-offline for B.
    let ev = recv_event(&mut a_rx).await;
    assert_eq!(ev.kind, EventKind::Offline);
    assert_eq!(ev.sender_id, 2);
    assert_silent(&mut a_rx).await;
    assert!(!hub.is_online(2));

    // B's queue drains its buffered frames and then closes.
    for _ in 0..OUTBOUND_QUEUE_CAPACITY {
        let ev = recv_event(&mut b_rx).await;
        assert_eq!(ev.kind, EventKind::Message);
    }
    assert_closed(&mut b_rx).await;
}

#[tokio::test]
async fn notify_user_on_saturated_queue_keeps_connection() {
    let hub = new_hub();
    let (a, mut a_rx) = hub.connect(1, "alice".into());
    hub.register(a).await;
    let (b, _b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    let _ = recv_event(&mut a_rx).await; // B online: registration applied

    let ev = Event::notification(EventKind::FriendRequest, 9, 2, &json!({"from": "mallory"}))
        .unwrap();
    for _ in 0..OUTBOUND_QUEUE_CAPACITY {
        hub.notify_user(2, &ev);
    }
    // Queue is full now; this one is dropped with no escalation.
    hub.notify_user(2, &ev);

    assert!(hub.is_online(2));
    assert_silent(&mut a_rx).await;
}

#[tokio::test]
async fn notify_offline_user_is_a_noop() {
    let hub = new_hub();
    hub.notify(42, EventKind::FriendAccepted, 7, &json!({"friend": "grace"}));
    assert!(!hub.is_online(42));
}

#[tokio::test]
async fn notify_delivers_server_originated_event() {
    let hub = new_hub();
    let (b, mut b_rx) = hub.connect(2, "bob".into());
    hub.register(b).await;
    // Prove registration applied before the side-channel read.
    let (probe, _probe_rx) = hub.connect(3, "probe".into());
    hub.register(probe).await;
    let _ = recv_event(&mut b_rx).await; // probe online

    hub.notify(2, EventKind::FriendRequest, 7, &json!({"from": "grace"}));

    let ev = recv_event(&mut b_rx).await;
    assert_eq!(ev.kind, EventKind::FriendRequest);
    assert_eq!(ev.sender_id, 7);
    assert_eq!(ev.receiver_id, Some(2));
    assert!(ev.timestamp.is_some());
}
