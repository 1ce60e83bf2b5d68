//! In-process bridge backed by a device table
//!
//! Commands are applied to the table immediately and echoed back as state
//! notifications, the same way the Caseta bridge reports the new level of
//! a device after it acts on a command.

use async_trait::async_trait;
use dashmap::DashMap;
use lutron_core::{DeviceId, DeviceInfo, RawDeviceState, MAX_LEVEL};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::{BridgeClient, BridgeCommand, BridgeError, BridgeEvent, StateNotification};

/// Default channel capacity for bridge notifications
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A bridge whose devices live in memory
pub struct MemoryBridge {
    /// Devices keyed by id; `DeviceInfo::state` holds the current state
    devices: DashMap<DeviceId, DeviceInfo>,
    connected: AtomicBool,
    reachable: AtomicBool,
    /// Source of notification sequence numbers
    sequence: AtomicU64,
    events: broadcast::Sender<BridgeEvent>,
    /// Every command that reached `send`, in call order
    issued: Mutex<Vec<(DeviceId, BridgeCommand)>>,
}

impl MemoryBridge {
    /// Create a bridge reporting the given devices
    pub fn new(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.device_id.clone(), d))
                .collect(),
            connected: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            sequence: AtomicU64::new(1),
            events,
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Make the bridge reachable or unreachable
    ///
    /// Becoming unreachable drops an established connection.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
        if !reachable && self.connected.swap(false, Ordering::SeqCst) {
            warn!("Bridge became unreachable");
            let _ = self.events.send(BridgeEvent::Disconnected);
        }
    }

    /// Add a device, announcing it to subscribers
    pub fn add_device(&self, device: DeviceInfo) {
        debug!(device_id = %device.device_id, "Adding device");
        self.devices.insert(device.device_id.clone(), device.clone());
        let _ = self.events.send(BridgeEvent::Discovered(device));
    }

    /// Remove a device, announcing the removal to subscribers
    pub fn remove_device(&self, device_id: &DeviceId) -> bool {
        let removed = self.devices.remove(device_id).is_some();
        if removed {
            debug!(device_id = %device_id, "Removing device");
            let _ = self.events.send(BridgeEvent::Removed(device_id.clone()));
        }
        removed
    }

    /// Change a device's state from outside the integration (wall keypad, Pico remote)
    pub fn set_state(&self, device_id: &DeviceId, state: RawDeviceState) -> bool {
        match self.devices.get_mut(device_id) {
            Some(mut device) => {
                device.state = state;
                self.notify(device_id, state);
                true
            }
            None => false,
        }
    }

    /// Current state of a device
    pub fn state(&self, device_id: &DeviceId) -> Option<RawDeviceState> {
        self.devices.get(device_id).map(|d| d.state)
    }

    /// Commands that reached `send`, in call order
    pub fn issued(&self) -> Vec<(DeviceId, BridgeCommand)> {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Emit a state notification with the next sequence number
    ///
    /// Must be called while holding the device's table entry so that
    /// notifications for one device leave in sequence order.
    fn notify(&self, device_id: &DeviceId, state: RawDeviceState) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .events
            .send(BridgeEvent::StateChanged(StateNotification {
                device_id: device_id.clone(),
                state,
                sequence,
            }));
    }

    fn apply(current: RawDeviceState, command: BridgeCommand) -> RawDeviceState {
        match command {
            BridgeCommand::TurnOn | BridgeCommand::OpenCover => RawDeviceState::level(MAX_LEVEL),
            BridgeCommand::TurnOff | BridgeCommand::CloseCover => RawDeviceState::level(0),
            BridgeCommand::SetValue(level) => RawDeviceState::level(level),
            BridgeCommand::StopCover => current,
        }
    }
}

#[async_trait]
impl BridgeClient for MemoryBridge {
    async fn connect(&self) -> Result<(), BridgeError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(BridgeError::Unreachable("no route to bridge".to_string()));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!(devices = self.devices.len(), "Bridge connected");
            let _ = self.events.send(BridgeEvent::Connected);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Bridge disconnected");
            let _ = self.events.send(BridgeEvent::Disconnected);
        }
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<DeviceInfo>, BridgeError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BridgeError::NotConnected);
        }
        let mut devices: Vec<DeviceInfo> = self.devices.iter().map(|d| d.clone()).collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn send(&self, device_id: &DeviceId, command: BridgeCommand) -> Result<(), BridgeError> {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((device_id.clone(), command));

        if !self.reachable.load(Ordering::SeqCst) {
            return Err(BridgeError::Unreachable("no route to bridge".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BridgeError::NotConnected);
        }
        if let BridgeCommand::SetValue(level) = command {
            if level > MAX_LEVEL {
                return Err(BridgeError::Rejected(format!("level {level} out of range")));
            }
        }

        let mut device = self
            .devices
            .get_mut(device_id)
            .ok_or_else(|| BridgeError::DeviceNotFound(device_id.clone()))?;
        let state = Self::apply(device.state, command);
        device.state = state;
        debug!(level = state.level, "Applied command");
        self.notify(device_id, state);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lutron_core::DeviceDomain;

    fn light(id: &str, level: u8) -> DeviceInfo {
        DeviceInfo {
            device_id: DeviceId::new(id).unwrap(),
            name: format!("Light {id}"),
            domain: DeviceDomain::Light,
            model: None,
            state: RawDeviceState::level(level),
        }
    }

    #[tokio::test]
    async fn test_send_echoes_state() {
        let bridge = MemoryBridge::new([light("1", 0)]);
        tokio_test::assert_ok!(bridge.connect().await);
        let mut rx = bridge.events();

        let id = DeviceId::new("1").unwrap();
        tokio_test::assert_ok!(bridge.send(&id, BridgeCommand::SetValue(40)).await);

        match rx.recv().await.unwrap() {
            BridgeEvent::StateChanged(n) => {
                assert_eq!(n.device_id, id);
                assert_eq!(n.state.level, 40);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(bridge.state(&id).unwrap().level, 40);
    }

    #[tokio::test]
    async fn test_sequence_increases() {
        let bridge = MemoryBridge::new([light("1", 0)]);
        tokio_test::assert_ok!(bridge.connect().await);
        let mut rx = bridge.events();
        let id = DeviceId::new("1").unwrap();

        bridge.send(&id, BridgeCommand::TurnOn).await.unwrap();
        bridge.send(&id, BridgeCommand::TurnOff).await.unwrap();

        let seqs: Vec<u64> = [rx.recv().await.unwrap(), rx.recv().await.unwrap()]
            .into_iter()
            .filter_map(|e| match e {
                BridgeEvent::StateChanged(n) => Some(n.sequence),
                _ => None,
            })
            .collect();
        assert_eq!(seqs.len(), 2);
        assert!(seqs[0] < seqs[1]);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let bridge = MemoryBridge::new([light("1", 0)]);
        let id = DeviceId::new("1").unwrap();
        assert_eq!(
            bridge.send(&id, BridgeCommand::TurnOn).await,
            Err(BridgeError::NotConnected)
        );
        assert_eq!(bridge.issued().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_bridge() {
        let bridge = MemoryBridge::new([light("1", 0)]);
        tokio_test::assert_ok!(bridge.connect().await);
        bridge.set_reachable(false);
        assert!(!bridge.is_connected());
        assert!(matches!(
            bridge.connect().await,
            Err(BridgeError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let bridge = MemoryBridge::new([]);
        tokio_test::assert_ok!(bridge.connect().await);
        let id = DeviceId::new("9").unwrap();
        assert_eq!(
            bridge.send(&id, BridgeCommand::TurnOn).await,
            Err(BridgeError::DeviceNotFound(id))
        );
    }
}
