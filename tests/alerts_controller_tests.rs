use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mongodb::bson::DateTime;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use warframe_utils::{
    auth, config,
    events,
    models::{Alert, Notification},
    routes,
    store::{AlertStore, MemoryAlertStore, TickBatch},
    AppState,
};

fn test_state() -> (AppState, Arc<MemoryAlertStore>) {
    let mut settings = config::load();
    settings.store_backend = config::StoreBackend::Memory;
    settings.jwt_secret = "test-secret".to_string();
    settings.jwt_cookie_name = "auth".to_string();
    // never reached by these tests
    settings.market_api_url = "http://127.0.0.1:9".to_string();
    settings.status_api_url = "http://127.0.0.1:9".to_string();

    let store = Arc::new(MemoryAlertStore::new());
    let state = AppState::build(settings, store.clone()).expect("app state");
    (state, store)
}

fn token_for(state: &AppState, user_id: &str) -> String {
    auth::issue_token(&state.settings, user_id, 1).expect("token")
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let text = response_body_string(res).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

async fn create(app: &Router, token: &str, body: Value) -> Value {
    let (status, alert) = send(app, "POST", "/api/alerts", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{alert}");
    alert
}

async fn notify(store: &MemoryAlertStore, alert_id: &str, price: rust_decimal::Decimal) {
    let id = mongodb::bson::oid::ObjectId::parse_str(alert_id).unwrap();
    let alert: Alert = store.alert(id).await.unwrap();
    let mut batch = TickBatch::new();
    batch.insert_notification(Notification::price_dropped(&alert, price, DateTime::now()));
    store.commit_tick(batch).await.unwrap();
}

#[tokio::test]
async fn alerts_require_a_session() {
    let (state, _store) = test_state();
    let app = routes::app(state);

    for (method, uri) in [
        ("GET", "/api/alerts"),
        ("POST", "/api/alerts"),
        ("GET", "/api/alerts/notifications/unread"),
        ("DELETE", "/api/alerts/65f000000000000000000000"),
        ("GET", "/api/events"),
        ("GET", "/api/user/me"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], "Unauthorized");
    }

    let (status, _) = send(&app, "GET", "/api/alerts", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let (state, _store) = test_state();
    let mut other = state.settings.clone();
    other.jwt_secret = "someone-else".to_string();
    let forged = auth::issue_token(&other, "user-1", 1).unwrap();

    let app = routes::app(state);
    let (status, _) = send(&app, "GET", "/api/alerts", Some(forged.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_alert_applies_defaults() {
    let (state, _store) = test_state();
    let token = token_for(&state, "user-1");
    let mut rx = state.events_tx.subscribe();
    let app = routes::app(state);

    let alert = create(
        &app,
        &token,
        json!({ "itemName": "  Serration  ", "itemId": "   ", "alertPrice": 15.5 }),
    )
    .await;

    assert_eq!(alert["itemName"], "Serration");
    assert_eq!(alert["itemId"], Value::Null);
    assert_eq!(alert["alertPrice"], 15.5);
    assert_eq!(alert["currentPrice"], Value::Null);
    assert_eq!(alert["isActive"], true);
    assert_eq!(alert["isTriggered"], false);
    assert_eq!(alert["isAcknowledged"], false);
    assert_eq!(alert["triggeredAt"], Value::Null);
    assert_eq!(alert["lastCheckedAt"], Value::Null);
    assert!(alert["id"].as_str().is_some_and(|id| id.len() == 24));

    assert_eq!(rx.try_recv().unwrap(), events::ALERTS_UPDATED);
}

#[tokio::test]
async fn create_alert_rejects_bad_payloads() {
    let (state, _store) = test_state();
    let token = token_for(&state, "user-1");
    let app = routes::app(state);

    let long_name = "x".repeat(501);
    let cases = [
        json!({ "itemName": "   ", "alertPrice": 10 }),
        json!({ "alertPrice": 10 }),
        json!({ "itemName": long_name, "alertPrice": 10 }),
        json!({ "itemName": "Serration", "itemId": "y".repeat(501), "alertPrice": 10 }),
        json!({ "itemName": "Serration", "alertPrice": -1 }),
        json!({ "itemName": "Serration", "alertPrice": 1000000 }),
        json!({ "itemName": "Serration" }),
        json!({ "itemName": "Serration", "alertPrice": "cheap" }),
    ];

    for body in cases {
        let (status, res) = send(&app, "POST", "/api/alerts", Some(token.as_str()), Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(res["error"].is_string(), "{res}");
    }

    let (status, alerts) = send(&app, "GET", "/api/alerts", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts, json!([]));
}

#[tokio::test]
async fn boundary_prices_are_accepted() {
    let (state, _store) = test_state();
    let token = token_for(&state, "user-1");
    let app = routes::app(state);

    let zero = create(&app, &token, json!({ "itemName": "Vitality", "alertPrice": 0 })).await;
    assert_eq!(zero["alertPrice"], 0.0);

    let max = create(&app, &token, json!({ "itemName": "Vitality", "alertPrice": 999999 })).await;
    assert_eq!(max["alertPrice"], 999999.0);
}

#[tokio::test]
async fn alerts_are_listed_newest_first_and_scoped_to_owner() {
    let (state, _store) = test_state();
    let alice = token_for(&state, "alice");
    let bob = token_for(&state, "bob");
    let app = routes::app(state);

    let first = create(&app, &alice, json!({ "itemName": "Serration", "alertPrice": 10 })).await;
    let second = create(&app, &alice, json!({ "itemName": "Vitality", "alertPrice": 20 })).await;
    create(&app, &bob, json!({ "itemName": "Flow", "alertPrice": 5 })).await;

    let (status, list) = send(&app, "GET", "/api/alerts", Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second["id"].as_str().unwrap(), first["id"].as_str().unwrap()]);

    let uri = format!("/api/alerts/{}", first["id"].as_str().unwrap());
    let (status, alert) = send(&app, "GET", &uri, Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["itemName"], "Serration");

    // another user's alert looks exactly like a missing one
    for (method, body) in [("GET", None), ("PUT", Some(json!({ "alertPrice": 1 }))), ("DELETE", None)] {
        let (status, res) = send(&app, method, &uri, Some(bob.as_str()), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
        assert_eq!(res["error"], "Not found");
    }
    let (status, _) = send(&app, "POST", &format!("{uri}/acknowledge"), Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/alerts/not-an-id", Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_alert_applies_partial_changes() {
    let (state, _store) = test_state();
    let token = token_for(&state, "user-1");
    let app = routes::app(state);

    let alert = create(&app, &token, json!({ "itemName": "Serration", "alertPrice": 10 })).await;
    let uri = format!("/api/alerts/{}", alert["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(token.as_str()),
        Some(json!({ "itemName": "  ", "alertPrice": 12.25, "isActive": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["itemName"], "Serration");
    assert_eq!(updated["alertPrice"], 12.25);
    assert_eq!(updated["isActive"], false);

    let created_at = alert["updatedAt"].as_str().unwrap();
    let updated_at = updated["updatedAt"].as_str().unwrap();
    let parse = |s: &str| chrono::DateTime::parse_from_rfc3339(s).unwrap();
    assert!(parse(updated_at) >= parse(created_at));

    let (status, renamed) = send(&app, "PUT", &uri, Some(token.as_str()), Some(json!({ "itemName": "Primed Serration" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["itemName"], "Primed Serration");
    assert_eq!(renamed["alertPrice"], 12.25);
    assert_eq!(renamed["isActive"], false);

    let (status, _) = send(&app, "PUT", &uri, Some(token.as_str()), Some(json!({ "alertPrice": -5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, unchanged) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(unchanged["alertPrice"], 12.25);
}

#[tokio::test]
async fn delete_alert_cascades_to_notifications() {
    let (state, store) = test_state();
    let token = token_for(&state, "user-1");
    let app = routes::app(state);

    let alert = create(&app, &token, json!({ "itemName": "Serration", "alertPrice": 15 })).await;
    let id = alert["id"].as_str().unwrap();
    notify(&store, id, dec!(11)).await;

    let (_, unread) = send(&app, "GET", "/api/alerts/notifications/unread", Some(token.as_str()), None).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let uri = format!("/api/alerts/{id}");
    let (status, body) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, unread) = send(&app, "GET", "/api/alerts/notifications/unread", Some(token.as_str()), None).await;
    assert_eq!(unread, json!([]));
}

#[tokio::test]
async fn acknowledge_marks_alert_dismissed() {
    let (state, _store) = test_state();
    let token = token_for(&state, "user-1");
    let app = routes::app(state);

    let alert = create(&app, &token, json!({ "itemName": "Serration", "alertPrice": 15 })).await;
    let uri = format!("/api/alerts/{}/acknowledge", alert["id"].as_str().unwrap());

    let (status, acked) = send(&app, "POST", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["isAcknowledged"], true);
    assert_eq!(acked["isTriggered"], false);
}

#[tokio::test]
async fn unread_notifications_can_be_marked_read() {
    let (state, store) = test_state();
    let token = token_for(&state, "user-1");
    let intruder = token_for(&state, "user-2");
    let app = routes::app(state);

    let alert = create(&app, &token, json!({ "itemName": "Serration", "alertPrice": 15 })).await;
    let alert_id = alert["id"].as_str().unwrap();
    notify(&store, alert_id, dec!(12)).await;
    notify(&store, alert_id, dec!(11)).await;

    let (status, unread) = send(&app, "GET", "/api/alerts/notifications/unread", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let unread = unread.as_array().unwrap().clone();
    assert_eq!(unread.len(), 2);

    let newest = &unread[0];
    assert_eq!(newest["priceAlertId"], alert_id);
    assert_eq!(newest["itemName"], "Serration");
    assert_eq!(newest["triggeredPrice"], 11.0);
    assert_eq!(newest["isRead"], false);
    assert_eq!(
        newest["message"],
        "The price of Serration has dropped to 11 platinum (alert threshold: 15)"
    );

    let uri = format!("/api/alerts/notifications/{}/read", newest["id"].as_str().unwrap());

    let (status, _) = send(&app, "POST", &uri, Some(intruder.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, read) = send(&app, "POST", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["isRead"], true);
    assert!(read["readAt"].is_string());

    let (_, unread) = send(&app, "GET", "/api/alerts/notifications/unread", Some(token.as_str()), None).await;
    let remaining = unread.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["triggeredPrice"], 12.0);

    let (_, theirs) = send(&app, "GET", "/api/alerts/notifications/unread", Some(intruder.as_str()), None).await;
    assert_eq!(theirs, json!([]));
}
