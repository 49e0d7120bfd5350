//! Synergy discovery: graph construction, chain search and scoring glue.

use std::collections::HashMap;

use homesense_core::{
    DeviceId, DeviceInfo, Pattern, PatternMeta, Result, Synergy, SynergyConfig, SynergyKind,
    SynergyMeta,
};
use tracing::{debug, info};

use crate::analyzers::{Benefit, analyze_chain};
use crate::graph::{DeviceGraph, EdgeKind};
use crate::search::{ChainCandidate, ChainSearcher};

/// Discovers beneficial device chains once per mining run.
pub struct SynergyEngine {
    config: SynergyConfig,
}

impl SynergyEngine {
    pub fn new(config: SynergyConfig) -> Self {
        Self { config }
    }

    /// Discover synergies from device metadata and the run's validated
    /// patterns. Runs strictly after the pattern detectors: pattern
    /// confidence feeds both the temporal edges and the support lookup.
    pub fn discover(&self, devices: &[DeviceInfo], patterns: &[Pattern]) -> Result<Vec<Synergy>> {
        let graph = DeviceGraph::build(devices, patterns);
        let chains = ChainSearcher::new(&graph, &self.config).search();
        debug!(chains = chains.len(), "raw chains from search");

        // Chains without a directed temporal backbone are symmetric;
        // keep one orientation per device set.
        let mut best: HashMap<(String, Vec<DeviceId>), (ChainCandidate, Vec<DeviceId>)> =
            HashMap::new();
        for chain in chains {
            let device_ids: Vec<DeviceId> = chain
                .indices
                .iter()
                .map(|&i| graph.device(i).device_id.clone())
                .collect();
            let mut set_key = device_ids.clone();
            if !chain.edge_kinds.contains(&EdgeKind::Temporal) {
                set_key.sort();
            }
            let key = (format!("{:?}", chain.dominant_kind()), set_key);
            match best.get(&key) {
                Some((held, _)) if held.weight_product >= chain.weight_product => {}
                _ => {
                    best.insert(key, (chain, device_ids));
                }
            }
        }

        let mut synergies = Vec::new();
        for (chain, device_ids) in best.into_values() {
            let infos: Vec<&DeviceInfo> =
                chain.indices.iter().map(|&i| graph.device(i)).collect();
            let benefits = analyze_chain(&infos);
            let kind = self.synergy_kind(&chain, benefits.dominant());

            let (support, lag) = self.pattern_support(&device_ids, patterns);
            let validated = support >= self.config.min_validating_confidence;

            let meta = SynergyMeta {
                area_id: shared_area(&infos),
                time_lag_secs: lag,
                capability_pairing: infos.windows(2).next().map(|pair| {
                    format!(
                        "{}->{}",
                        pair[0].capability.slug(),
                        pair[1].capability.slug()
                    )
                }),
                edge_weight_product: chain.weight_product,
                extra: serde_json::Value::Null,
            };

            let mut synergy = Synergy::new(
                kind,
                device_ids,
                benefits.impact_score(),
                chain.weight_product,
                meta,
            )?;
            synergy.set_pattern_support(support, validated);
            synergies.push(synergy);
        }

        synergies.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
        info!(count = synergies.len(), "synergy discovery complete");
        Ok(synergies)
    }

    /// Map the chain's dominant relationship and benefit to a synergy kind.
    fn synergy_kind(&self, chain: &ChainCandidate, benefit: Option<Benefit>) -> SynergyKind {
        match benefit {
            Some(Benefit::Energy) => SynergyKind::Energy,
            Some(Benefit::Convenience) => SynergyKind::Convenience,
            _ => match chain.dominant_kind() {
                EdgeKind::Temporal => SynergyKind::Temporal,
                EdgeKind::Spatial => SynergyKind::Spatial,
                EdgeKind::Capability => SynergyKind::Capability,
            },
        }
    }

    /// Best matching pattern confidence over the chain's adjacent pairs,
    /// plus the typical lag when a co-occurrence pattern supplied it.
    fn pattern_support(
        &self,
        chain: &[DeviceId],
        patterns: &[Pattern],
    ) -> (f64, Option<i64>) {
        let mut support = 0.0f64;
        let mut lag = None;
        for pair in chain.windows(2) {
            for pattern in patterns {
                if !pattern.kind.is_suggestible() {
                    continue;
                }
                if pattern.involves(&pair[0]) && pattern.involves(&pair[1]) {
                    if pattern.confidence > support {
                        support = pattern.confidence;
                        if let PatternMeta::CoOccurrence {
                            median_lag_secs, ..
                        } = &pattern.meta
                        {
                            lag = Some(*median_lag_secs);
                        }
                    }
                }
            }
        }
        (support.clamp(0.0, 1.0), lag)
    }
}

/// Area shared by every device in the chain, if any.
fn shared_area(infos: &[&DeviceInfo]) -> Option<String> {
    let first = infos.first()?.area_id.clone()?;
    if infos
        .iter()
        .all(|d| d.area_id.as_deref() == Some(first.as_str()))
    {
        Some(first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::{DeviceCapability, PatternKind, TimeWindowStats};

    fn hall_devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new("motion_hall", DeviceCapability::MotionSensor).with_area("hall"),
            DeviceInfo::new("light_hall", DeviceCapability::DimmableLight).with_area("hall"),
        ]
    }

    fn motion_light_pattern() -> Pattern {
        let occurrences: Vec<_> = (1..=20)
            .map(|d| Utc.with_ymd_and_hms(2026, 1, d, 18, 0, 0).unwrap())
            .collect();
        Pattern::new(
            PatternKind::CoOccurrence,
            vec!["motion_hall".into(), "light_hall".into()],
            0.91,
            20,
            TimeWindowStats::from_occurrences(&occurrences).unwrap(),
            PatternMeta::CoOccurrence {
                trigger: "motion_hall".into(),
                target: "light_hall".into(),
                window_secs: 300,
                pair_count: 20,
                trigger_count: 22,
                median_lag_secs: 90,
                extra: serde_json::Value::Null,
            },
        )
    }

    /// A pattern links the pair and they share an area, so the
    /// discovered synergy is pattern-validated.
    #[test]
    fn test_pattern_validates_spatial_chain() {
        let engine = SynergyEngine::new(SynergyConfig::default());
        let synergies = engine
            .discover(&hall_devices(), &[motion_light_pattern()])
            .unwrap();

        let validated = synergies
            .iter()
            .find(|s| s.involves("motion_hall") && s.involves("light_hall"))
            .expect("synergy over the hall pair");
        assert!(validated.validated_by_patterns);
        assert!(validated.pattern_support > 0.0);
        assert_eq!(validated.meta.area_id.as_deref(), Some("hall"));
        assert_eq!(validated.meta.time_lag_secs, Some(90));
    }

    #[test]
    fn test_no_patterns_means_no_validation() {
        let engine = SynergyEngine::new(SynergyConfig::default());
        let synergies = engine.discover(&hall_devices(), &[]).unwrap();
        assert!(!synergies.is_empty());
        for synergy in &synergies {
            assert!(!synergy.validated_by_patterns);
            assert_eq!(synergy.pattern_support, 0.0);
        }
    }

    #[test]
    fn test_chain_invariants_hold() {
        let mut devices = hall_devices();
        devices.push(DeviceInfo::new("switch_hall", DeviceCapability::Switch).with_area("hall"));
        devices
            .push(DeviceInfo::new("temp_hall", DeviceCapability::ClimateSensor).with_area("hall"));

        let engine = SynergyEngine::new(SynergyConfig::default());
        let synergies = engine.discover(&devices, &[]).unwrap();
        for synergy in &synergies {
            assert!(synergy.chain.len() >= 2 && synergy.chain.len() <= 4);
            let mut unique = synergy.chain.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), synergy.chain.len());
            assert!(synergy.confidence >= 0.0 && synergy.confidence <= 1.0);
        }
    }
}
