//! Core types for the HomeSense mining engine.
//!
//! This crate defines the shared data model used across the workspace:
//! normalized device events, detected behavior patterns, discovered device
//! synergies, user feedback records, device capability metadata, and the
//! engine-wide configuration.

pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod feedback;
pub mod pattern;
pub mod synergy;

pub use config::{
    CacheConfig, DetectorConfig, MiningConfig, SchedulerConfig, ScoringConfig, SynergyConfig,
};
pub use device::{DeviceCapability, DeviceInfo};
pub use error::{Error, Result};
pub use event::{Event, EventFilter, TimeRange};
pub use feedback::{FeedbackRecord, TargetKind};
pub use pattern::{
    DayClass, Pattern, PatternKind, PatternMeta, Season, TimeWindowStats, canonical_devices,
};
pub use synergy::{Synergy, SynergyKind, SynergyMeta};

/// Device identifier as reported by the home-automation hub.
pub type DeviceId = String;
