//! Device relationship graph.
//!
//! Devices are interned to dense indices and edges live in an adjacency
//! list keyed by those indices, so the bounded chain search can track
//! visited devices with a bitmask instead of chasing pointers.

use std::collections::HashMap;

use homesense_core::{DeviceId, DeviceInfo, Pattern, PatternKind, PatternMeta};
use tracing::debug;

/// Default weight for a shared-area edge.
const SPATIAL_WEIGHT: f64 = 0.6;
/// Default weight for a capability-compatibility edge.
const CAPABILITY_WEIGHT: f64 = 0.5;
/// Minimum pattern confidence that creates a temporal edge.
const MIN_TEMPORAL_CONFIDENCE: f64 = 0.3;

/// Edge relationship kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Devices share an area.
    Spatial,
    /// Pattern evidence links the devices in time.
    Temporal,
    /// Capabilities complement each other (sensor drives actuator).
    Capability,
}

/// A directed weighted edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub to: usize,
    pub kind: EdgeKind,
    /// Weight in (0,1].
    pub weight: f64,
}

/// In-memory relationship graph for one mining run.
#[derive(Debug)]
pub struct DeviceGraph {
    devices: Vec<DeviceInfo>,
    index: HashMap<DeviceId, usize>,
    adjacency: Vec<Vec<Edge>>,
}

impl DeviceGraph {
    /// Build the graph from device metadata and validated patterns.
    pub fn build(devices: &[DeviceInfo], patterns: &[Pattern]) -> Self {
        let mut graph = Self {
            devices: devices.to_vec(),
            index: devices
                .iter()
                .enumerate()
                .map(|(i, d)| (d.device_id.clone(), i))
                .collect(),
            adjacency: vec![Vec::new(); devices.len()],
        };
        graph.add_spatial_edges();
        graph.add_capability_edges();
        graph.add_temporal_edges(patterns);
        debug!(
            devices = graph.devices.len(),
            edges = graph.edge_count(),
            "device graph built"
        );
        graph
    }

    pub fn node_count(&self) -> usize {
        self.devices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|a| a.len()).sum()
    }

    pub fn device(&self, idx: usize) -> &DeviceInfo {
        &self.devices[idx]
    }

    pub fn index_of(&self, device_id: &str) -> Option<usize> {
        self.index.get(device_id).copied()
    }

    pub fn edges_from(&self, idx: usize) -> &[Edge] {
        &self.adjacency[idx]
    }

    /// Best edge between two nodes, if any.
    pub fn best_edge(&self, from: usize, to: usize) -> Option<&Edge> {
        self.adjacency[from]
            .iter()
            .filter(|e| e.to == to)
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
    }

    /// Add an edge, keeping only the strongest edge per (from, to, kind).
    fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind, weight: f64) {
        if from == to {
            return;
        }
        let weight = weight.clamp(f64::MIN_POSITIVE, 1.0);
        let edges = &mut self.adjacency[from];
        if let Some(existing) = edges.iter_mut().find(|e| e.to == to && e.kind == kind) {
            existing.weight = existing.weight.max(weight);
        } else {
            edges.push(Edge { to, kind, weight });
        }
    }

    /// Undirected shared-area edges.
    fn add_spatial_edges(&mut self) {
        for i in 0..self.devices.len() {
            for j in i + 1..self.devices.len() {
                let (a, b) = (&self.devices[i], &self.devices[j]);
                if let (Some(area_a), Some(area_b)) = (&a.area_id, &b.area_id) {
                    if area_a == area_b {
                        self.add_edge(i, j, EdgeKind::Spatial, SPATIAL_WEIGHT);
                        self.add_edge(j, i, EdgeKind::Spatial, SPATIAL_WEIGHT);
                    }
                }
            }
        }
    }

    /// Directed sensor-to-actuator compatibility edges.
    fn add_capability_edges(&mut self) {
        for i in 0..self.devices.len() {
            for j in 0..self.devices.len() {
                if i == j {
                    continue;
                }
                let (from, to) = (&self.devices[i], &self.devices[j]);
                if from.capability.is_sensor() && to.capability.is_controllable() {
                    self.add_edge(i, j, EdgeKind::Capability, CAPABILITY_WEIGHT);
                }
            }
        }
    }

    /// Temporal edges sourced from pattern confidence. Ordered pattern
    /// kinds (co-occurrence, sequence) produce directed edges; unordered
    /// ones link both ways.
    fn add_temporal_edges(&mut self, patterns: &[Pattern]) {
        for pattern in patterns {
            if pattern.confidence < MIN_TEMPORAL_CONFIDENCE {
                continue;
            }
            match &pattern.meta {
                PatternMeta::CoOccurrence { trigger, target, .. }
                | PatternMeta::Contextual { trigger, target, .. }
                | PatternMeta::RoomBased { trigger, target, .. } => {
                    if let (Some(from), Some(to)) =
                        (self.index_of(trigger), self.index_of(target))
                    {
                        self.add_edge(from, to, EdgeKind::Temporal, pattern.confidence);
                    }
                }
                PatternMeta::Sequence { order, .. } => {
                    for pair in order.windows(2) {
                        if let (Some(from), Some(to)) =
                            (self.index_of(&pair[0]), self.index_of(&pair[1]))
                        {
                            self.add_edge(from, to, EdgeKind::Temporal, pattern.confidence);
                        }
                    }
                }
                _ => {
                    // Unordered multi-device patterns (session) link every
                    // pair both ways.
                    if pattern.kind == PatternKind::Session {
                        for a in &pattern.devices {
                            for b in &pattern.devices {
                                if let (Some(from), Some(to)) =
                                    (self.index_of(a), self.index_of(b))
                                {
                                    self.add_edge(
                                        from,
                                        to,
                                        EdgeKind::Temporal,
                                        pattern.confidence,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::{DeviceCapability, PatternKind, TimeWindowStats};

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new("motion_hall", DeviceCapability::MotionSensor).with_area("hall"),
            DeviceInfo::new("light_hall", DeviceCapability::DimmableLight).with_area("hall"),
            DeviceInfo::new("light_kitchen", DeviceCapability::DimmableLight)
                .with_area("kitchen"),
        ]
    }

    fn co_occurrence_pattern(confidence: f64) -> Pattern {
        let occurrences: Vec<_> = (1..=5)
            .map(|d| Utc.with_ymd_and_hms(2026, 1, d, 18, 0, 0).unwrap())
            .collect();
        Pattern::new(
            PatternKind::CoOccurrence,
            vec!["motion_hall".into(), "light_hall".into()],
            confidence,
            5,
            TimeWindowStats::from_occurrences(&occurrences).unwrap(),
            PatternMeta::CoOccurrence {
                trigger: "motion_hall".into(),
                target: "light_hall".into(),
                window_secs: 300,
                pair_count: 5,
                trigger_count: 6,
                median_lag_secs: 45,
                extra: serde_json::Value::Null,
            },
        )
    }

    #[test]
    fn test_spatial_edges_for_shared_area() {
        let graph = DeviceGraph::build(&devices(), &[]);
        let motion = graph.index_of("motion_hall").unwrap();
        let hall = graph.index_of("light_hall").unwrap();
        let kitchen = graph.index_of("light_kitchen").unwrap();

        assert!(graph
            .edges_from(motion)
            .iter()
            .any(|e| e.to == hall && e.kind == EdgeKind::Spatial));
        assert!(!graph
            .edges_from(motion)
            .iter()
            .any(|e| e.to == kitchen && e.kind == EdgeKind::Spatial));
    }

    #[test]
    fn test_capability_edges_sensor_to_actuator_only() {
        let graph = DeviceGraph::build(&devices(), &[]);
        let motion = graph.index_of("motion_hall").unwrap();
        let hall = graph.index_of("light_hall").unwrap();

        assert!(graph
            .edges_from(motion)
            .iter()
            .any(|e| e.to == hall && e.kind == EdgeKind::Capability));
        // The light does not drive the sensor.
        assert!(!graph
            .edges_from(hall)
            .iter()
            .any(|e| e.to == motion && e.kind == EdgeKind::Capability));
    }

    #[test]
    fn test_temporal_edge_weight_from_pattern_confidence() {
        let graph = DeviceGraph::build(&devices(), &[co_occurrence_pattern(0.85)]);
        let motion = graph.index_of("motion_hall").unwrap();
        let hall = graph.index_of("light_hall").unwrap();

        let edge = graph
            .edges_from(motion)
            .iter()
            .find(|e| e.to == hall && e.kind == EdgeKind::Temporal)
            .expect("temporal edge");
        assert_eq!(edge.weight, 0.85);
    }

    #[test]
    fn test_weak_pattern_creates_no_temporal_edge() {
        let graph = DeviceGraph::build(&devices(), &[co_occurrence_pattern(0.2)]);
        let motion = graph.index_of("motion_hall").unwrap();
        assert!(!graph
            .edges_from(motion)
            .iter()
            .any(|e| e.kind == EdgeKind::Temporal));
    }
}
