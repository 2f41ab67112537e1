//! End-to-end gateway tests: subscribe, fan-out, presence and teardown.

use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_public_fanout_excludes_originating_socket() {
    let app = TestApp::new().await;
    let mut alice = app.connect().await;
    let mut bob = app.connect().await;

    alice.subscribe("orders").await;
    bob.subscribe("orders").await;

    app.bus
        .publish(
            "orders",
            json!({"event": "created", "data": {"id": 7, "socket": alice.socket_id}})
                .to_string(),
        )
        .await
        .unwrap();

    let frame = bob.next_frame().await;
    assert_eq!(frame["event"], "orders:created");
    assert_eq!(frame["channel"], "orders");
    assert_eq!(frame["data"]["id"], 7);
    alice.expect_silence().await;

    // Public channels never reach the authorization service.
    assert_eq!(app.auth_requests("/broadcasting/auth").await, 0);
}

#[tokio::test]
async fn test_unsubscribed_channel_receives_nothing() {
    let app = TestApp::new().await;
    let mut client = app.connect().await;
    client.subscribe("orders").await;

    app.bus
        .publish("invoices", json!({"event": "paid", "data": {}}).to_string())
        .await
        .unwrap();

    client.expect_silence().await;
}

#[tokio::test]
async fn test_presence_join_leave_and_close() {
    let app = TestApp::new().await;
    let mut alice = app.connect_as("u1").await;
    let mut bob = app.connect_as("u2").await;

    alice.subscribe("presence-room").await;
    let joined = alice.next_frame().await;
    assert_eq!(joined["event"], "presence-room:member_added");
    assert_eq!(joined["member"]["id"], "u1");
    assert_eq!(
        joined["members"]["u1"]["socket_ids"],
        json!([alice.socket_id.clone()])
    );

    bob.subscribe("presence-room").await;
    let joined = alice.next_frame().await;
    assert_eq!(joined["event"], "presence-room:member_added");
    assert_eq!(joined["member"]["id"], "u2");
    assert_eq!(joined["members"]["u2"]["name"], "U2");
    let roster = joined["members"].as_object().unwrap();
    assert_eq!(roster.len(), 2);
    let _own_join = bob.next_frame().await;

    bob.send(json!({"event": "leave", "channel": "presence-room"}))
        .await;
    let left = bob.next_frame().await;
    assert_eq!(left["event"], "presence-room:left");
    let removed = alice.next_frame().await;
    assert_eq!(removed["event"], "presence-room:member_removed");
    assert_eq!(removed["member"]["id"], "u2");
    assert!(removed["members"].get("u2").is_none());

    // Rejoin, then drop the socket without leaving.
    bob.subscribe("presence-room").await;
    let _rejoin = alice.next_frame().await;
    bob.close().await;

    let removed = alice.next_frame().await;
    assert_eq!(removed["event"], "presence-room:member_removed");
    assert_eq!(removed["member"]["id"], "u2");
    assert_eq!(removed["member"]["info"]["name"], "U2");
    app.wait_for_connections(1).await;
}

#[tokio::test]
async fn test_refused_private_channel_is_silent() {
    let app = TestApp::new().await;
    let mut client = app.connect_as("u1").await;

    client
        .send(json!({"event": "subscribe", "channel": "private-secret"}))
        .await;
    client.expect_silence().await;

    app.bus
        .publish("private-secret", json!({"event": "leak", "data": {}}).to_string())
        .await
        .unwrap();
    client.expect_silence().await;

    assert!(!app.engine.channels.is_subscribed("private-secret", &client.socket_id));
}

#[tokio::test]
async fn test_private_grant_is_cached_per_member() {
    let app = TestApp::new().await;
    let mut first = app.connect_as("u1").await;
    let mut second = app.connect_as("u1").await;

    first.subscribe("private-orders").await;
    second.subscribe("private-orders").await;

    assert_eq!(app.auth_requests("/broadcasting/auth").await, 1);
}

#[tokio::test]
async fn test_private_channel_without_identity_is_refused() {
    let app = TestApp::new().await;
    let mut client = app.connect().await;

    client
        .send(json!({"event": "subscribe", "channel": "private-orders"}))
        .await;
    client.expect_silence().await;
    assert_eq!(app.engine.channels.subscriber_count("private-orders"), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;
    let _client = app.connect().await;
    app.wait_for_connections(1).await;

    let response = reqwest::get(format!("http://{}/health/detailed", app.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["connections"], 1);
}
