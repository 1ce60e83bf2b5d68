//! Driver lifecycle: bridge connection and the bridge notification listener

use lutron_bridge::{BridgeEvent, SharedBridgeClient};
use lutron_core::events::{DeviceState, DeviceStateData};
use lutron_event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{MapperError, MapperResult};
use crate::mapper::{EntityMapper, SyncSummary};

/// The running integration as the hub sees it
///
/// Owns the connection lifecycle of the bridge and feeds bridge
/// notifications into the entity mapper.
pub struct Driver {
    bridge: SharedBridgeClient,
    mapper: Arc<EntityMapper>,
    event_bus: Arc<EventBus>,
    state: RwLock<DeviceState>,
}

impl Driver {
    pub fn new(
        bridge: SharedBridgeClient,
        mapper: Arc<EntityMapper>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            bridge,
            mapper,
            event_bus,
            state: RwLock::new(DeviceState::Disconnected),
        }
    }

    pub fn mapper(&self) -> &Arc<EntityMapper> {
        &self.mapper
    }

    /// Current connection state
    pub async fn device_state(&self) -> DeviceState {
        *self.state.read().await
    }

    async fn set_device_state(&self, state: DeviceState) {
        let mut current = self.state.write().await;
        if *current != state {
            debug!(?state, "Device state changed");
            *current = state;
            self.event_bus.fire_typed(DeviceStateData { state });
        }
    }

    /// Connect to the bridge and load its devices
    #[instrument(skip(self))]
    pub async fn connect(&self) -> MapperResult<()> {
        self.set_device_state(DeviceState::Connecting).await;

        if let Err(e) = self.bridge.connect().await {
            error!(error = %e, "Could not connect to bridge");
            self.set_device_state(DeviceState::Error).await;
            return Err(MapperError::BridgeUnavailable(e));
        }

        if let Err(e) = self.resync().await {
            self.set_device_state(DeviceState::Error).await;
            return Err(e);
        }
        self.mapper.set_available(true);
        self.set_device_state(DeviceState::Connected).await;
        info!(entities = self.mapper.entity_count(), "Connected to bridge");
        Ok(())
    }

    /// Disconnect from the bridge, reporting every entity unavailable
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        self.mapper.set_available(false);
        if let Err(e) = self.bridge.disconnect().await {
            warn!(error = %e, "Error while disconnecting from bridge");
        }
        self.set_device_state(DeviceState::Disconnected).await;
    }

    /// Reload the device list from the bridge
    pub async fn resync(&self) -> MapperResult<SyncSummary> {
        let devices = self.bridge.devices().await?;
        Ok(self.mapper.sync_devices(&devices))
    }

    /// Spawn the task that applies bridge notifications
    ///
    /// The subscription is taken before this returns, so nothing the bridge
    /// emits afterwards is missed.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.bridge.events();
        let driver = Arc::clone(self);
        tokio::spawn(async move { driver.run_listener(rx).await })
    }

    async fn run_listener(&self, mut rx: broadcast::Receiver<BridgeEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.handle_bridge_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Bridge listener lagged, resynchronizing devices");
                    // Notifications still queued predate the snapshot
                    rx = rx.resubscribe();
                    if let Err(e) = self.resync().await {
                        warn!(error = %e, "Resynchronization failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Bridge notification stream closed");
                    break;
                }
            }
        }
    }

    /// Apply one bridge notification
    pub async fn handle_bridge_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Connected => {
                self.mapper.set_available(true);
                self.set_device_state(DeviceState::Connected).await;
            }
            BridgeEvent::Disconnected => {
                self.mapper.set_available(false);
                self.set_device_state(DeviceState::Disconnected).await;
            }
            BridgeEvent::Discovered(info) => {
                self.mapper.register_device(&info);
            }
            BridgeEvent::Removed(device_id) => {
                self.mapper.remove_device(&device_id);
            }
            BridgeEvent::StateChanged(notification) => {
                if let Err(e) = self.mapper.on_bridge_state_changed(
                    &notification.device_id,
                    notification.state,
                    notification.sequence,
                ) {
                    warn!(error = %e, "Dropping bridge notification");
                }
            }
        }
    }
}
