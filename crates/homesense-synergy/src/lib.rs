//! Synergy discovery engine for the HomeSense mining engine.
//!
//! Builds an in-memory device relationship graph (spatial, temporal and
//! capability edges) per mining run, searches it for beneficial 2-4 device
//! chains with bounded depth-first traversal, and scores each chain's
//! estimated benefit through capability analyzers. Persisted patterns
//! validate chains and raise their confidence.

pub mod analyzers;
pub mod engine;
pub mod graph;
pub mod search;

pub use analyzers::BenefitBreakdown;
pub use engine::SynergyEngine;
pub use graph::{DeviceGraph, Edge, EdgeKind};
pub use search::{ChainCandidate, ChainSearcher};
