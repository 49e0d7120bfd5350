//! Device capability metadata.
//!
//! Capability classifications come from an external device-metadata
//! collaborator; the synergy engine consumes them to build capability edges
//! and estimate chain benefits.

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Capability classification for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCapability {
    MotionSensor,
    ContactSensor,
    LightSensor,
    ClimateSensor,
    DimmableLight,
    Switch,
    Thermostat,
    MediaPlayer,
    Lock,
    Camera,
    EnergyMonitor,
    Unknown,
}

impl DeviceCapability {
    pub fn slug(&self) -> &'static str {
        match self {
            DeviceCapability::MotionSensor => "motion_sensor",
            DeviceCapability::ContactSensor => "contact_sensor",
            DeviceCapability::LightSensor => "light_sensor",
            DeviceCapability::ClimateSensor => "climate_sensor",
            DeviceCapability::DimmableLight => "dimmable_light",
            DeviceCapability::Switch => "switch",
            DeviceCapability::Thermostat => "thermostat",
            DeviceCapability::MediaPlayer => "media_player",
            DeviceCapability::Lock => "lock",
            DeviceCapability::Camera => "camera",
            DeviceCapability::EnergyMonitor => "energy_monitor",
            DeviceCapability::Unknown => "unknown",
        }
    }

    /// Whether the device emits observations rather than accepting commands.
    pub fn is_sensor(&self) -> bool {
        matches!(
            self,
            DeviceCapability::MotionSensor
                | DeviceCapability::ContactSensor
                | DeviceCapability::LightSensor
                | DeviceCapability::ClimateSensor
                | DeviceCapability::EnergyMonitor
                | DeviceCapability::Camera
        )
    }

    /// Whether the device can be driven by an automation.
    pub fn is_controllable(&self) -> bool {
        matches!(
            self,
            DeviceCapability::DimmableLight
                | DeviceCapability::Switch
                | DeviceCapability::Thermostat
                | DeviceCapability::MediaPlayer
                | DeviceCapability::Lock
        )
    }

    /// Whether driving this device consumes meaningful energy. Used by the
    /// energy benefit analyzer.
    pub fn draws_power(&self) -> bool {
        matches!(
            self,
            DeviceCapability::DimmableLight
                | DeviceCapability::Switch
                | DeviceCapability::Thermostat
                | DeviceCapability::MediaPlayer
        )
    }
}

/// Device metadata as supplied by the external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub capability: DeviceCapability,
    pub area_id: Option<String>,
    /// Human-readable name, display only.
    pub name: Option<String>,
}

impl DeviceInfo {
    pub fn new(device_id: impl Into<String>, capability: DeviceCapability) -> Self {
        Self {
            device_id: device_id.into(),
            capability,
            area_id: None,
            name: None,
        }
    }

    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
