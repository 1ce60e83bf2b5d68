//! The entity mapper
//!
//! Holds the single authoritative view of known devices and their current
//! hub attributes. Hub commands and bridge notifications both go through
//! it; every change to an entity and the hub event describing that change
//! happen under the entity's map guard, so events for one entity reach the
//! bus in the order the changes were applied.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lutron_bridge::SharedBridgeClient;
use lutron_core::events::{EntityAvailableData, EntityChangeData, EntityRemovedData};
use lutron_core::{
    Command, DeviceId, DeviceInfo, EntityAttributes, EntityId, EntityKind, RawDeviceState,
};
use lutron_event_bus::EventBus;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

use crate::cover::{self, Direction};
use crate::error::{MapperError, MapperResult};
use crate::light;

/// Per-device bookkeeping
#[derive(Debug, Clone)]
struct TrackedEntity {
    entity_id: EntityId,
    name: String,
    /// Last raw state received from the bridge
    raw: RawDeviceState,
    /// Attributes last pushed to the hub
    attributes: EntityAttributes,
    /// Sequence of the last applied bridge notification
    last_sequence: u64,
    /// Last movement direction (covers only)
    direction: Option<Direction>,
}

impl TrackedEntity {
    fn new(entity_id: EntityId, info: &DeviceInfo, last_sequence: u64) -> Self {
        Self {
            attributes: EntityAttributes::from_raw(entity_id.kind(), &info.state),
            entity_id,
            name: info.name.clone(),
            raw: info.state,
            last_sequence,
            direction: None,
        }
    }

    fn kind(&self) -> EntityKind {
        self.entity_id.kind()
    }

    fn available_data(&self) -> EntityAvailableData {
        EntityAvailableData {
            entity_id: self.entity_id.clone(),
            entity_type: self.kind(),
            name: self.name.clone(),
            features: self.kind().supported_commands().to_vec(),
            attributes: self.attributes.to_map(),
        }
    }

    fn change_data(&self) -> EntityChangeData {
        EntityChangeData {
            entity_id: self.entity_id.clone(),
            entity_type: self.kind(),
            attributes: self.attributes.to_map(),
        }
    }
}

/// Outcome of reconciling the mapping with a discovery snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    pub refreshed: usize,
}

/// Translates hub commands into bridge calls and bridge state into hub attributes
pub struct EntityMapper {
    /// Tracked entities keyed by bridge device id
    entities: DashMap<DeviceId, TrackedEntity>,
    /// Last applied sequence of devices no longer tracked
    retired_sequences: DashMap<DeviceId, u64>,
    bridge: SharedBridgeClient,
    event_bus: Arc<EventBus>,
}

impl EntityMapper {
    /// Create an empty mapper issuing calls on `bridge` and publishing on `event_bus`
    pub fn new(bridge: SharedBridgeClient, event_bus: Arc<EventBus>) -> Self {
        Self {
            entities: DashMap::new(),
            retired_sequences: DashMap::new(),
            bridge,
            event_bus,
        }
    }

    /// Handle a hub command for an entity
    ///
    /// The entity and command are validated before anything is sent to the
    /// bridge. A bridge failure is returned as-is; there is no retry here.
    /// The resulting state arrives later through
    /// [`on_bridge_state_changed`](Self::on_bridge_state_changed).
    #[instrument(skip(self, params))]
    pub async fn handle_command(
        &self,
        entity_id: &str,
        command: &str,
        params: Option<&Value>,
    ) -> MapperResult<()> {
        let unknown = || MapperError::UnknownEntity(entity_id.to_string());
        let id: EntityId = entity_id.parse().map_err(|_| unknown())?;

        // Copy out what resolution needs and release the guard before the bridge call
        let (attributes, raw, direction) = {
            let entry = self.entities.get(id.device_id()).ok_or_else(unknown)?;
            if entry.entity_id != id {
                return Err(unknown());
            }
            (entry.attributes, entry.raw, entry.direction)
        };

        let unsupported = || MapperError::UnsupportedCommand {
            entity_id: entity_id.to_string(),
            command: command.to_string(),
        };
        let cmd: Command = command.parse().map_err(|_| unsupported())?;
        if !id.kind().supports(cmd) {
            warn!(kind = %id.kind(), "Command not supported for entity kind");
            return Err(unsupported());
        }

        let bridge_command = match attributes {
            EntityAttributes::Light(current) => light::resolve(cmd, params, &current),
            EntityAttributes::Cover(_) => cover::resolve(cmd, direction, &raw),
        }
        .map_err(|e| match e {
            MapperError::UnsupportedCommand { .. } => unsupported(),
            other => other,
        })?;

        debug!(?bridge_command, "Sending command to bridge");
        if let Err(e) = self.bridge.send(id.device_id(), bridge_command).await {
            warn!(error = %e, "Bridge rejected command");
            return Err(MapperError::BridgeUnavailable(e));
        }

        if id.kind() == EntityKind::Cover {
            if let Some(mut entry) = self.entities.get_mut(id.device_id()) {
                entry.direction = cover::issued_direction(bridge_command);
            }
        }

        Ok(())
    }

    /// Apply a bridge state notification and push the resulting attributes
    ///
    /// Notifications older than the last applied one for the device are
    /// ignored, so the entity always converges on the state the bridge
    /// emitted last. Attributes equal to the ones already pushed produce
    /// no hub event.
    #[instrument(skip(self, raw_state), fields(device_id = %device_id))]
    pub fn on_bridge_state_changed(
        &self,
        device_id: &DeviceId,
        raw_state: RawDeviceState,
        sequence: u64,
    ) -> MapperResult<EntityAttributes> {
        let mut entry = self
            .entities
            .get_mut(device_id)
            .ok_or_else(|| MapperError::UnknownDevice(device_id.clone()))?;

        if sequence <= entry.last_sequence {
            debug!(
                sequence,
                last_sequence = entry.last_sequence,
                "Ignoring stale notification"
            );
            return Ok(entry.attributes);
        }
        entry.last_sequence = sequence;

        if entry.kind() == EntityKind::Cover {
            entry.direction =
                cover::observed_direction(entry.direction, entry.raw.level, raw_state.level);
        }
        entry.raw = raw_state;

        let attributes = EntityAttributes::from_raw(entry.kind(), &raw_state);
        if attributes == entry.attributes {
            trace!("Attributes unchanged");
            return Ok(attributes);
        }

        entry.attributes = attributes;
        debug!(?attributes, "Pushing entity change");
        self.event_bus.fire_typed(entry.change_data());
        Ok(attributes)
    }

    /// Start tracking a discovered device
    ///
    /// Devices outside the light and cover domains are ignored. A device
    /// already tracked has its name and state refreshed.
    #[instrument(skip(self, info), fields(device_id = %info.device_id))]
    pub fn register_device(&self, info: &DeviceInfo) -> Option<EntityId> {
        let Some(kind) = EntityKind::from_domain(&info.domain) else {
            debug!(domain = ?info.domain, "Ignoring device outside light/cover domains");
            return None;
        };
        let entity_id = EntityId::new(kind, info.device_id.clone());

        match self.entities.entry(info.device_id.clone()) {
            Entry::Occupied(mut occupied) if occupied.get().entity_id == entity_id => {
                let entry = occupied.get_mut();
                entry.name = info.name.clone();
                entry.raw = info.state;
                let attributes = EntityAttributes::from_raw(kind, &info.state);
                if attributes != entry.attributes {
                    entry.attributes = attributes;
                    self.event_bus.fire_typed(entry.change_data());
                }
            }
            Entry::Occupied(mut occupied) => {
                info!(old = %occupied.get().entity_id, new = %entity_id, "Device changed kind");
                self.event_bus.fire_typed(EntityRemovedData {
                    entity_id: occupied.get().entity_id.clone(),
                });
                let last_sequence = occupied.get().last_sequence;
                let tracked = TrackedEntity::new(entity_id.clone(), info, last_sequence);
                self.event_bus.fire_typed(tracked.available_data());
                occupied.insert(tracked);
            }
            Entry::Vacant(vacant) => {
                info!(entity_id = %entity_id, name = %info.name, "Registering entity");
                let last_sequence = self
                    .retired_sequences
                    .remove(&info.device_id)
                    .map_or(0, |(_, sequence)| sequence);
                let tracked = vacant.insert(TrackedEntity::new(
                    entity_id.clone(),
                    info,
                    last_sequence,
                ));
                self.event_bus.fire_typed(tracked.available_data());
            }
        }

        Some(entity_id)
    }

    /// Stop tracking a device
    #[instrument(skip(self), fields(device_id = %device_id))]
    pub fn remove_device(&self, device_id: &DeviceId) -> Option<EntityId> {
        let (_, tracked) = self.entities.remove(device_id)?;
        info!(entity_id = %tracked.entity_id, "Removing entity");
        self.retired_sequences
            .insert(device_id.clone(), tracked.last_sequence);
        self.event_bus.fire_typed(EntityRemovedData {
            entity_id: tracked.entity_id.clone(),
        });
        Some(tracked.entity_id)
    }

    /// Reconcile the mapping with a full discovery snapshot
    ///
    /// Registers new devices, refreshes known ones and removes every tracked
    /// device the snapshot no longer contains.
    #[instrument(skip(self, devices), fields(count = devices.len()))]
    pub fn sync_devices(&self, devices: &[DeviceInfo]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let mut reported = HashSet::new();

        for device in devices {
            let known = self.entities.contains_key(&device.device_id);
            if let Some(entity_id) = self.register_device(device) {
                reported.insert(device.device_id.clone());
                if known {
                    summary.refreshed += 1;
                } else {
                    summary.added.push(entity_id);
                }
            }
        }

        let stale: Vec<DeviceId> = self
            .entities
            .iter()
            .filter(|e| !reported.contains(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for device_id in stale {
            if let Some(entity_id) = self.remove_device(&device_id) {
                summary.removed.push(entity_id);
            }
        }

        info!(
            added = summary.added.len(),
            removed = summary.removed.len(),
            refreshed = summary.refreshed,
            "Synchronized devices"
        );
        summary
    }

    /// Mark every entity available or unavailable
    ///
    /// Becoming available again re-pushes the last state the bridge reported.
    #[instrument(skip(self))]
    pub fn set_available(&self, available: bool) {
        for mut entry in self.entities.iter_mut() {
            let attributes = if available {
                EntityAttributes::from_raw(entry.kind(), &entry.raw)
            } else {
                EntityAttributes::unavailable(entry.kind())
            };
            if attributes != entry.attributes {
                entry.attributes = attributes;
                self.event_bus.fire_typed(entry.change_data());
            }
        }
    }

    /// Current attributes of an entity
    pub fn attributes(&self, entity_id: &EntityId) -> Option<EntityAttributes> {
        self.entities
            .get(entity_id.device_id())
            .filter(|e| &e.entity_id == entity_id)
            .map(|e| e.attributes)
    }

    /// Check whether an entity is known
    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.attributes(entity_id).is_some()
    }

    /// Descriptions of every known entity, ordered by entity id
    pub fn available_entities(&self) -> Vec<EntityAvailableData> {
        let mut entities: Vec<_> = self.entities.iter().map(|e| e.available_data()).collect();
        entities.sort_by_key(|e| e.entity_id.to_string());
        entities
    }

    /// Current attributes of every known entity, ordered by entity id
    pub fn entity_states(&self) -> Vec<EntityChangeData> {
        let mut states: Vec<_> = self.entities.iter().map(|e| e.change_data()).collect();
        states.sort_by_key(|e| e.entity_id.to_string());
        states
    }

    /// Get the total number of tracked entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Thread-safe wrapper for EntityMapper
pub type SharedEntityMapper = Arc<EntityMapper>;
