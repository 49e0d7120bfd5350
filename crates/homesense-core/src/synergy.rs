//! Device synergies: discovered beneficial 2-4 device chains.
//!
//! A synergy differs from a pattern: it is a recommended combination of
//! devices derived from the relationship graph, not an observed frequency.
//! Identity is stable over the chain, so feedback submitted against a
//! synergy keeps applying across re-mining runs as long as the chain is
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceId, Error, Result};

/// Minimum devices in a chain.
pub const MIN_CHAIN_LEN: usize = 2;
/// Maximum devices in a chain.
pub const MAX_CHAIN_LEN: usize = 4;

/// Relationship type backing a synergy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyKind {
    /// Devices share an area.
    Spatial,
    /// Devices co-occur in time (backed by pattern evidence).
    Temporal,
    /// Device capabilities complement each other.
    Capability,
    /// Chain with an estimated energy benefit.
    Energy,
    /// Chain with a convenience benefit.
    Convenience,
}

impl SynergyKind {
    pub fn slug(&self) -> &'static str {
        match self {
            SynergyKind::Spatial => "spatial",
            SynergyKind::Temporal => "temporal",
            SynergyKind::Capability => "capability",
            SynergyKind::Energy => "energy",
            SynergyKind::Convenience => "convenience",
        }
    }
}

/// Chain-specific context attached to a synergy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynergyMeta {
    /// Shared area, for spatial chains.
    pub area_id: Option<String>,
    /// Typical trigger-to-effect lag in seconds, for temporal chains.
    pub time_lag_secs: Option<i64>,
    /// Capability pairing description, e.g. `motion_sensor->dimmable_light`.
    pub capability_pairing: Option<String>,
    /// Edge-weight product from the chain search.
    pub edge_weight_product: f64,
    /// Escape hatch for new analyzer payloads.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// A discovered beneficial device chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synergy {
    /// Stable identity derived from `(kind, chain)`.
    pub synergy_id: String,
    pub kind: SynergyKind,
    /// Ordered device chain, length 2-4, no repeated device.
    pub chain: Vec<DeviceId>,
    /// Unitless benefit estimate from the capability analyzers.
    pub impact_score: f64,
    /// Final confidence in [0,1].
    pub confidence: f64,
    /// Support from matching persisted patterns, in [0,1].
    pub pattern_support: f64,
    /// True only when at least one supporting pattern clears the configured
    /// confidence minimum.
    pub validated_by_patterns: bool,
    pub meta: SynergyMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Synergy {
    /// Derive the stable id for a `(kind, chain)` combination. Chain order
    /// matters: `a>b` and `b>a` are different recommendations.
    pub fn stable_id(kind: SynergyKind, chain: &[DeviceId]) -> String {
        format!("{}:{}", kind.slug(), chain.join(">"))
    }

    /// Create a synergy, validating the chain invariants.
    pub fn new(
        kind: SynergyKind,
        chain: Vec<DeviceId>,
        impact_score: f64,
        confidence: f64,
        meta: SynergyMeta,
    ) -> Result<Self> {
        Self::validate_chain(&chain)?;
        let now = Utc::now();
        Ok(Self {
            synergy_id: Self::stable_id(kind, &chain),
            kind,
            chain,
            impact_score,
            confidence: confidence.clamp(0.0, 1.0),
            pattern_support: 0.0,
            validated_by_patterns: false,
            meta,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check chain length and the no-repeated-device invariant.
    pub fn validate_chain(chain: &[DeviceId]) -> Result<()> {
        if chain.len() < MIN_CHAIN_LEN || chain.len() > MAX_CHAIN_LEN {
            return Err(Error::Validation(format!(
                "chain length {} outside {}..={}",
                chain.len(),
                MIN_CHAIN_LEN,
                MAX_CHAIN_LEN
            )));
        }
        for (i, device) in chain.iter().enumerate() {
            if chain[i + 1..].contains(device) {
                return Err(Error::Validation(format!(
                    "device '{device}' appears twice in chain"
                )));
            }
        }
        Ok(())
    }

    /// Record pattern support, keeping both bounded invariants.
    pub fn set_pattern_support(&mut self, support: f64, validated: bool) {
        self.pattern_support = support.clamp(0.0, 1.0);
        self.validated_by_patterns = validated;
    }

    /// Update confidence, preserving the [0,1] invariant.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    /// Adjacent device pairs of the chain, in order.
    pub fn adjacent_pairs(&self) -> impl Iterator<Item = (&DeviceId, &DeviceId)> {
        self.chain.windows(2).map(|w| (&w[0], &w[1]))
    }

    pub fn involves(&self, device_id: &str) -> bool {
        self.chain.iter().any(|d| d == device_id)
    }
}
