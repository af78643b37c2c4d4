//! Failure-mode tests driven from a hand-rolled peer: one real store on one
//! end of the channel, the test itself playing the other side frame by
//! frame. This is how timeouts, reordering, disconnects, and GC traffic are
//! observed exactly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use remowire::{decode, encode, Frame, WireValue};
use remostore::mock_transport::{BlackHoleTransport, ClosedTransport, DuplexChannelTransport};
use remostore::transport::Transport;
use remostore::{CallArg, DynObject, Error, ObjectStore, RemoteValue, State, StoreOptions};

async fn recv_frame(peer: &DuplexChannelTransport) -> Frame {
    let message = peer
        .recv()
        .await
        .expect("transport failed")
        .expect("channel closed");
    decode(message).expect("undecodable frame")
}

async fn send_frame(peer: &DuplexChannelTransport, frame: Frame) {
    peer.send(encode(&frame).expect("encoding failed"))
        .await
        .expect("send failed");
}

/// Answers the store's opening handshake so it reaches `Open`.
async fn complete_handshake(peer: &DuplexChannelTransport) {
    match recv_frame(peer).await {
        Frame::Handshake => send_frame(peer, Frame::Done).await,
        other => panic!("Expected a handshake, got {:?}", other),
    }
}

fn expect_plain(value: RemoteValue) -> serde_json::Value {
    match value {
        RemoteValue::Plain(value) => value,
        RemoteValue::Remote(proxy) => panic!("Expected plain data, got proxy for '{}'", proxy.id()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn test_timeout_then_late_response_is_ignored() {
    init_tracing();
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(
        Arc::new(a),
        StoreOptions::default().with_timeout(Duration::from_millis(50)),
    );
    complete_handshake(&b).await;

    let proxy = store.get_remote_object("slow");
    let started = Instant::now();
    let call = tokio::spawn({
        let proxy = proxy.clone();
        async move { proxy.invoke("work", vec![]).await }
    });

    // The peer sees the call but withholds the answer.
    let Frame::Call { id: stale_id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(40), "rejected too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "rejected too late: {:?}", elapsed);

    // The answer shows up after the caller gave up: dropped on the floor.
    send_frame(&b, Frame::response_ok(stale_id, WireValue::plain(json!("late")))).await;

    // A later, unrelated call is unaffected by the stale response.
    let call = tokio::spawn({
        let proxy = proxy.clone();
        async move { proxy.invoke("work", vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };
    assert_ne!(id, stale_id);
    send_frame(&b, Frame::response_ok(id, WireValue::plain(json!("pong")))).await;
    assert_eq!(expect_plain(call.await.unwrap().unwrap()), json!("pong"));
}

#[tokio::test]
async fn test_concurrent_calls_correlate_out_of_order() {
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());
    complete_handshake(&b).await;

    let proxy = store.get_remote_object("calc");
    let mut handles = Vec::new();
    for k in 0..3i64 {
        handles.push(tokio::spawn({
            let proxy = proxy.clone();
            async move { proxy.invoke("echo", vec![CallArg::Plain(json!(k))]).await }
        }));
    }

    // Collect all three calls, remembering which correlation id carried
    // which argument.
    let mut calls = Vec::new();
    for _ in 0..3 {
        match recv_frame(&b).await {
            Frame::Call { id, args, .. } => {
                let WireValue::Plain { data } = &args[0] else {
                    panic!("Expected a plain argument");
                };
                calls.push((id, data.as_i64().unwrap()));
            }
            other => panic!("Expected a call frame, got {:?}", other),
        }
    }

    // Answer in reverse order; correlation is by id, not arrival order.
    for (id, k) in calls.iter().rev() {
        send_frame(&b, Frame::response_ok(*id, WireValue::plain(json!(*k * 10)))).await;
    }

    for (k, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(expect_plain(result), json!(k as i64 * 10));
    }
}

#[tokio::test]
async fn test_disconnect_rejects_all_pending() {
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());
    complete_handshake(&b).await;

    let proxy = store.get_remote_object("busy");
    let mut handles = Vec::new();
    for _ in 0..3 {
        handles.push(tokio::spawn({
            let proxy = proxy.clone();
            async move { proxy.invoke("work", vec![]).await }
        }));
    }
    for _ in 0..3 {
        let Frame::Call { .. } = recv_frame(&b).await else {
            panic!("Expected a call frame");
        };
    }

    // Tear the channel down with all three requests in flight.
    drop(b);

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Disconnected), "got {:?}", err);
    }
    assert_eq!(store.state(), State::Closed);

    // New calls on the dead store reject immediately.
    let err = proxy.invoke("work", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Closed), "got {:?}", err);
}

#[tokio::test]
async fn test_gc_release_sent_once_per_dead_reference() {
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());
    complete_handshake(&b).await;

    let factory = store.get_remote_object("factory");

    // A call that returns an object reference.
    let call = tokio::spawn({
        let factory = factory.clone();
        async move { factory.invoke("make", vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };
    send_frame(&b, Frame::response_ok(id, WireValue::reference("#peer-1"))).await;

    let made = call.await.unwrap().unwrap().into_remote().expect("expected a proxy");
    drop(made);

    // First sweep reports the dead reference.
    store.sync_gc().await;
    match recv_frame(&b).await {
        Frame::GcRelease { target } => assert_eq!(target, "#peer-1"),
        other => panic!("Expected a gc release, got {:?}", other),
    }

    // A redundant sweep reports nothing new.
    store.sync_gc().await;
    let quiet = tokio::time::timeout(Duration::from_millis(50), b.recv()).await;
    assert!(quiet.is_err(), "unexpected frame after redundant sweep");

    // The same id coming back into use is tracked afresh.
    let revived = store.get_remote_object("#peer-1");
    store.sync_gc().await;
    let quiet = tokio::time::timeout(Duration::from_millis(50), b.recv()).await;
    assert!(quiet.is_err(), "live reference must not be released");

    drop(revived);
    store.sync_gc().await;
    match recv_frame(&b).await {
        Frame::GcRelease { target } => assert_eq!(target, "#peer-1"),
        other => panic!("Expected a gc release, got {:?}", other),
    }
}

#[tokio::test]
async fn test_saturation_bound_fails_excess_call_locally() {
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(
        Arc::new(a),
        StoreOptions::default()
            .with_timeout(Duration::from_secs(5))
            .with_max_pending(1),
    );
    complete_handshake(&b).await;

    let proxy = store.get_remote_object("busy");
    let first = tokio::spawn({
        let proxy = proxy.clone();
        async move { proxy.invoke("work", vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };

    // One request outstanding: the next one fails fast, nothing on the wire.
    let err = proxy.invoke("work", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Saturated(1)), "got {:?}", err);

    // Settling the first call frees the slot again.
    send_frame(&b, Frame::response_ok(id, WireValue::plain(json!("done")))).await;
    assert_eq!(expect_plain(first.await.unwrap().unwrap()), json!("done"));

    let second = tokio::spawn({
        let proxy = proxy.clone();
        async move { proxy.invoke("work", vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };
    send_frame(&b, Frame::response_ok(id, WireValue::plain(json!("again")))).await;
    assert_eq!(expect_plain(second.await.unwrap().unwrap()), json!("again"));
}

#[tokio::test]
async fn test_no_peer_means_timeout_not_hang() {
    let store = ObjectStore::open(
        Arc::new(BlackHoleTransport::new()),
        StoreOptions::default().with_timeout(Duration::from_millis(50)),
    );

    // Exposing is local and works before any handshake.
    store.expose_remote_object("local", Arc::new(DynObject::new()));
    assert_eq!(store.state(), State::Connecting);

    let started = Instant::now();
    let err = store.get_remote_object("x").call(vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_peer_initiated_handshake_is_acknowledged() {
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());

    // The peer opens the conversation instead of answering ours.
    send_frame(&b, Frame::Handshake).await;

    // We observe the store's own greeting and its acknowledgement.
    let seen = vec![recv_frame(&b).await, recv_frame(&b).await];
    assert!(seen.contains(&Frame::Handshake));
    assert!(seen.contains(&Frame::Done));
    assert_eq!(store.state(), State::Open);

    // And the channel is fully usable.
    let call = tokio::spawn({
        let proxy = store.get_remote_object("x");
        async move { proxy.call(vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };
    send_frame(&b, Frame::response_ok(id, WireValue::plain(json!(1)))).await;
    assert_eq!(expect_plain(call.await.unwrap().unwrap()), json!(1));
}

#[tokio::test]
async fn test_undecodable_message_is_dropped_not_fatal() {
    init_tracing();
    let (a, b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());
    complete_handshake(&b).await;

    // Garbage on the channel is logged and dropped, not a teardown.
    b.send(json!({ "type": "gibberish" })).await.unwrap();
    b.send(json!(42)).await.unwrap();

    let call = tokio::spawn({
        let proxy = store.get_remote_object("x");
        async move { proxy.call(vec![]).await }
    });
    let Frame::Call { id, .. } = recv_frame(&b).await else {
        panic!("Expected a call frame");
    };
    send_frame(&b, Frame::response_ok(id, WireValue::plain(json!("still alive")))).await;
    assert_eq!(expect_plain(call.await.unwrap().unwrap()), json!("still alive"));
    assert_eq!(store.state(), State::Open);
}

#[tokio::test]
async fn test_dead_channel_closes_store_immediately() {
    let store = ObjectStore::open(Arc::new(ClosedTransport), StoreOptions::default());

    // The pump observes the dead channel on its first read.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.state(), State::Closed);

    let err = store.get_remote_object("x").call(vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Closed), "got {:?}", err);
}

#[tokio::test]
async fn test_closed_store_rejects_everything() {
    let (a, _b) = DuplexChannelTransport::pair();
    let store = ObjectStore::open(Arc::new(a), StoreOptions::default());
    store.expose_remote_object("api", Arc::new(DynObject::new()));

    store.close();
    assert_eq!(store.state(), State::Closed);

    let err = store.get_remote_object("api").call(vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Closed), "got {:?}", err);

    let err = store.request_remote_object("api").await.unwrap_err();
    assert!(matches!(err, Error::Closed), "got {:?}", err);

    // Exposure becomes a no-op; the registry was unwound.
    store.expose_remote_object("late", Arc::new(DynObject::new()));
    assert!(!store.delete_remote_object("late"));
    assert!(!store.delete_remote_object("api"));

    // Redundant close and a best-effort sweep are harmless.
    store.close();
    store.sync_gc().await;
}
