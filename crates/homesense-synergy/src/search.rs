//! Bounded depth-first chain search over the device graph.

use homesense_core::SynergyConfig;
use tracing::debug;

use crate::graph::{DeviceGraph, EdgeKind};

/// Hard cap on emitted chains per run; dense graphs stay bounded even with
/// a permissive prune floor.
const MAX_CHAINS: usize = 512;

/// A surviving chain from the search.
#[derive(Debug, Clone)]
pub struct ChainCandidate {
    /// Device indices into the graph, in chain order.
    pub indices: Vec<usize>,
    /// Running edge-weight product.
    pub weight_product: f64,
    /// Edge kinds along the chain.
    pub edge_kinds: Vec<EdgeKind>,
}

impl ChainCandidate {
    /// Most frequent edge kind along the chain; ties resolve toward the
    /// stronger relationship (temporal > spatial > capability).
    pub fn dominant_kind(&self) -> EdgeKind {
        let count = |kind| self.edge_kinds.iter().filter(|k| **k == kind).count();
        let temporal = count(EdgeKind::Temporal);
        let spatial = count(EdgeKind::Spatial);
        let capability = count(EdgeKind::Capability);
        if temporal >= spatial && temporal >= capability && temporal > 0 {
            EdgeKind::Temporal
        } else if spatial >= capability && spatial > 0 {
            EdgeKind::Spatial
        } else {
            EdgeKind::Capability
        }
    }
}

/// Depth-first searcher with cycle avoidance and weight-product pruning.
pub struct ChainSearcher<'a> {
    graph: &'a DeviceGraph,
    max_depth: usize,
    prune_floor: f64,
}

impl<'a> ChainSearcher<'a> {
    pub fn new(graph: &'a DeviceGraph, config: &SynergyConfig) -> Self {
        Self {
            graph,
            // Chains cannot exceed 4 devices regardless of configuration.
            max_depth: config.max_chain_depth.clamp(2, 4),
            prune_floor: config.prune_floor,
        }
    }

    /// Explore chains of length 2..=max_depth from every start device.
    pub fn search(&self) -> Vec<ChainCandidate> {
        let mut chains = Vec::new();
        for start in 0..self.graph.node_count() {
            let mut path = vec![start];
            let visited = 1u64 << (start % 64);
            self.explore(&mut path, visited, 1.0, Vec::new(), &mut chains);
            if chains.len() >= MAX_CHAINS {
                break;
            }
        }
        debug!(chains = chains.len(), "chain search complete");
        chains
    }

    fn explore(
        &self,
        path: &mut Vec<usize>,
        visited: u64,
        product: f64,
        edge_kinds: Vec<EdgeKind>,
        chains: &mut Vec<ChainCandidate>,
    ) {
        if chains.len() >= MAX_CHAINS || path.len() >= self.max_depth {
            if path.len() >= 2 && chains.len() < MAX_CHAINS {
                chains.push(ChainCandidate {
                    indices: path.clone(),
                    weight_product: product,
                    edge_kinds,
                });
            }
            return;
        }
        if path.len() >= 2 {
            chains.push(ChainCandidate {
                indices: path.clone(),
                weight_product: product,
                edge_kinds: edge_kinds.clone(),
            });
        }

        let current = *path.last().unwrap_or(&0);
        for edge in self.graph.edges_from(current) {
            let bit = 1u64 << (edge.to % 64);
            // A device never reappears in its own chain. The bitmask is a
            // fast pre-check; the path scan settles bit collisions past
            // 64 devices.
            if visited & bit != 0 && path.contains(&edge.to) {
                continue;
            }
            let next_product = product * edge.weight;
            if next_product < self.prune_floor {
                continue;
            }
            path.push(edge.to);
            let mut next_kinds = edge_kinds.clone();
            next_kinds.push(edge.kind);
            self.explore(path, visited | bit, next_product, next_kinds, chains);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homesense_core::{DeviceCapability, DeviceInfo};

    fn hall_devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new("motion_hall", DeviceCapability::MotionSensor).with_area("hall"),
            DeviceInfo::new("light_hall", DeviceCapability::DimmableLight).with_area("hall"),
            DeviceInfo::new("switch_hall", DeviceCapability::Switch).with_area("hall"),
        ]
    }

    #[test]
    fn test_chains_are_bounded_and_acyclic() {
        let graph = DeviceGraph::build(&hall_devices(), &[]);
        let config = SynergyConfig::default();
        let chains = ChainSearcher::new(&graph, &config).search();

        assert!(!chains.is_empty());
        for chain in &chains {
            assert!(chain.indices.len() >= 2 && chain.indices.len() <= 4);
            let mut devices = chain.indices.clone();
            devices.sort();
            devices.dedup();
            assert_eq!(devices.len(), chain.indices.len(), "cycle in {chain:?}");
        }
    }

    #[test]
    fn test_prune_floor_cuts_weak_chains() {
        let graph = DeviceGraph::build(&hall_devices(), &[]);
        let strict = SynergyConfig {
            prune_floor: 0.99,
            ..Default::default()
        };
        let chains = ChainSearcher::new(&graph, &strict).search();
        // Spatial and capability edges carry weight < 0.99, so nothing
        // survives.
        assert!(chains.is_empty());
    }

    #[test]
    fn test_weight_product_multiplies_along_chain() {
        let graph = DeviceGraph::build(&hall_devices(), &[]);
        let config = SynergyConfig::default();
        let chains = ChainSearcher::new(&graph, &config).search();
        for chain in chains {
            if chain.indices.len() == 3 {
                // Two edges, each at most 0.6 (spatial default).
                assert!(chain.weight_product <= 0.6 * 0.6 + 1e-9);
            }
        }
    }
}
