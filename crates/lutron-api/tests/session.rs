//! Hub session tests: requests and hub events through the dispatcher

use lutron_api::websocket::{handle_message, ActiveConnection, OutgoingMessage};
use lutron_api::AppState;
use lutron_bridge::{BridgeClient, MemoryBridge};
use lutron_core::{DeviceDomain, DeviceId, DeviceInfo, RawDeviceState};
use lutron_entity_mapper::{Driver, EntityMapper};
use lutron_event_bus::EventBus;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Session {
    bridge: Arc<MemoryBridge>,
    conn: ActiveConnection,
    tx: mpsc::Sender<OutgoingMessage>,
    rx: mpsc::Receiver<OutgoingMessage>,
}

impl Session {
    fn new() -> Self {
        let bridge = Arc::new(MemoryBridge::new([
            DeviceInfo {
                device_id: DeviceId::new("2").unwrap(),
                name: "Kitchen Pendants".to_string(),
                domain: DeviceDomain::Light,
                model: Some("PD-6WCL".to_string()),
                state: RawDeviceState::level(0),
            },
            DeviceInfo {
                device_id: DeviceId::new("5").unwrap(),
                name: "Office Shade".to_string(),
                domain: DeviceDomain::Cover,
                model: None,
                state: RawDeviceState::level(100),
            },
        ]));
        let event_bus = Arc::new(EventBus::new());
        let mapper = Arc::new(EntityMapper::new(bridge.clone(), event_bus.clone()));
        let driver = Arc::new(Driver::new(bridge.clone(), mapper, event_bus.clone()));
        let state = AppState {
            driver,
            event_bus,
            driver_name: Arc::new("Lutron Caseta".to_string()),
        };
        let (tx, rx) = mpsc::channel(64);
        Self {
            bridge,
            conn: ActiveConnection::new(state),
            tx,
            rx,
        }
    }

    async fn send(&self, message: Value) {
        handle_message(&self.conn, &message.to_string(), &self.tx)
            .await
            .unwrap();
    }

    async fn request(&mut self, id: u64, msg: &str, msg_data: Value) -> Value {
        self.send(json!({"kind": "req", "id": id, "msg": msg, "msg_data": msg_data}))
            .await;
        loop {
            let value = self.next().await;
            if value["kind"] == "resp" {
                assert_eq!(value["req_id"], id);
                return value;
            }
        }
    }

    async fn next(&mut self) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("no outgoing message within timeout")
            .expect("outgoing channel closed");
        serde_json::to_value(msg).unwrap()
    }

    async fn connect(&mut self) {
        self.send(json!({"kind": "event", "msg": "connect", "cat": "REMOTE"}))
            .await;
    }
}

#[tokio::test]
async fn test_driver_version() {
    let mut session = Session::new();

    let resp = session.request(1, "get_driver_version", json!({})).await;
    assert_eq!(resp["code"], 200);
    assert_eq!(resp["msg"], "driver_version");
    assert_eq!(resp["msg_data"]["name"], "Lutron Caseta");
    assert_eq!(
        resp["msg_data"]["version"]["driver"],
        lutron_api::DRIVER_VERSION
    );
}

#[tokio::test]
async fn test_connect_event_exposes_entities() {
    let mut session = Session::new();

    let resp = session.request(1, "get_device_state", json!({})).await;
    assert_eq!(resp["msg_data"]["state"], "DISCONNECTED");

    session.connect().await;
    assert!(session.bridge.is_connected());

    let resp = session.request(2, "get_device_state", json!({})).await;
    assert_eq!(resp["msg_data"]["state"], "CONNECTED");

    let resp = session.request(3, "get_available_entities", json!({})).await;
    let entities = resp["msg_data"]["available_entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["entity_id"], "cover.5");
    assert_eq!(entities[0]["entity_type"], "cover");
    assert_eq!(entities[1]["entity_id"], "light.2");
    assert_eq!(entities[1]["name"], "Kitchen Pendants");
    assert_eq!(
        entities[1]["features"],
        json!(["turn_on", "turn_off", "set_brightness", "toggle"])
    );

    let resp = session.request(4, "get_entity_states", json!({})).await;
    assert_eq!(resp["msg_data"][0]["attributes"]["state"], "OPEN");
    assert_eq!(resp["msg_data"][1]["attributes"]["state"], "OFF");
}

#[tokio::test]
async fn test_entity_command_status_codes() {
    let mut session = Session::new();
    session.connect().await;

    let resp = session
        .request(
            1,
            "entity_command",
            json!({"entity_id": "light.2", "cmd_id": "turn_on", "params": {"brightness": 255}}),
        )
        .await;
    assert_eq!(resp["code"], 200);

    let resp = session
        .request(
            2,
            "entity_command",
            json!({"entity_id": "light.9", "cmd_id": "turn_on"}),
        )
        .await;
    assert_eq!(resp["code"], 404);

    let resp = session
        .request(
            3,
            "entity_command",
            json!({"entity_id": "light.2", "cmd_id": "open"}),
        )
        .await;
    assert_eq!(resp["code"], 400);

    let resp = session
        .request(
            4,
            "entity_command",
            json!({"entity_id": "light.2", "cmd_id": "set_brightness", "params": {"brightness": 999}}),
        )
        .await;
    assert_eq!(resp["code"], 400);
    assert_eq!(resp["msg_data"]["code"], "BAD_REQUEST");

    session.bridge.set_reachable(false);
    let resp = session
        .request(
            5,
            "entity_command",
            json!({"entity_id": "cover.5", "cmd_id": "close"}),
        )
        .await;
    assert_eq!(resp["code"], 503);
}

#[tokio::test]
async fn test_malformed_requests_get_bad_request() {
    let mut session = Session::new();

    let resp = session.request(1, "do_the_thing", json!({})).await;
    assert_eq!(resp["code"], 400);

    let resp = session
        .request(2, "entity_command", json!({"cmd_id": "turn_on"}))
        .await;
    assert_eq!(resp["code"], 400);
}

#[tokio::test]
async fn test_subscription_forwards_events() {
    let mut session = Session::new();

    let resp = session.request(1, "subscribe_events", json!({})).await;
    assert_eq!(resp["code"], 200);
    assert!(session.conn.is_subscribed().await);

    session.connect().await;

    // CONNECTING, entity_available for both devices, CONNECTED
    let mut seen = Vec::new();
    while seen.len() < 4 {
        let msg = session.next().await;
        assert_eq!(msg["kind"], "event");
        seen.push(msg["msg"].as_str().unwrap().to_string());
    }
    assert_eq!(
        seen,
        vec![
            "device_state",
            "entity_available",
            "entity_available",
            "device_state"
        ]
    );

    let resp = session.request(2, "unsubscribe_events", json!({})).await;
    assert_eq!(resp["code"], 200);
    assert!(!session.conn.is_subscribed().await);
}

#[tokio::test]
async fn test_standby_disconnects_bridge() {
    let mut session = Session::new();
    session.connect().await;

    session
        .send(json!({"kind": "event", "msg": "enter_standby", "cat": "REMOTE"}))
        .await;
    assert!(!session.bridge.is_connected());

    let resp = session.request(1, "get_entity_states", json!({})).await;
    assert_eq!(resp["msg_data"][0]["attributes"]["state"], "UNAVAILABLE");
    assert_eq!(resp["msg_data"][1]["attributes"]["state"], "UNAVAILABLE");

    session
        .send(json!({"kind": "event", "msg": "exit_standby", "cat": "REMOTE"}))
        .await;
    assert!(session.bridge.is_connected());
}
