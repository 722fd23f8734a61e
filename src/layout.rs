//! Layout strategies for the neural map.
//!
//! Three strategies are supported. `force` does not place nodes itself: it
//! produces a `ForceSimulationConfig` that an injected simulation runner
//! (in production, the client-side force-graph runtime) consumes, plus a
//! seeded set of starting positions so the physics start state is
//! reproducible. `radial` and `tree` assign literal coordinates and are
//! fully deterministic: rebuilding the same graph reproduces identical
//! positions.
//!
//! The selected strategy is the only state; it changes solely through
//! explicit selection in the map request.

use crate::models::{GraphEdge, GraphNode, NeuralMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

// ============================================================================
// Strategy Selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutStrategy {
    #[default]
    Force,
    Radial,
    Tree,
}

impl std::str::FromStr for LayoutStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "force" => Ok(LayoutStrategy::Force),
            "radial" => Ok(LayoutStrategy::Radial),
            "tree" => Ok(LayoutStrategy::Tree),
            other => Err(format!("unknown layout: {}", other)),
        }
    }
}

/// Apply the selected strategy to the map. Returns the simulation
/// configuration when the strategy delegates placement to a physics
/// runtime, None when coordinates were assigned directly.
pub fn apply_layout(map: &mut NeuralMap, strategy: LayoutStrategy) -> Option<ForceSimulationConfig> {
    match strategy {
        LayoutStrategy::Force => {
            seed_initial_positions(&mut map.nodes);
            Some(ForceSimulationConfig::default())
        }
        LayoutStrategy::Radial => {
            radial_layout(map);
            None
        }
        LayoutStrategy::Tree => {
            tree_layout(map);
            None
        }
    }
}

// ============================================================================
// Force Simulation Configuration
// ============================================================================

/// Tuning contract handed to the external force-simulation runtime.
///
/// The runtime derives per-link and per-node parameters from this value:
/// link distance shrinks as similarity grows, link strength scales with
/// similarity, and each node's collision radius grows with its degree up
/// to a cap so hub labels stay readable. `cooldown_ticks: None` tells the
/// simulation to never fully cool (dragging stays responsive) while
/// `cooldown_time_ms` bounds any single warm-up burst.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForceSimulationConfig {
    pub link_distance_base: f64,
    pub link_dampening: f64,
    pub charge_strength: f64,
    /// Repulsion is only applied within this distance so the simulation
    /// converges in bounded time.
    pub charge_max_distance: f64,
    pub collision_base_radius: f64,
    pub collision_degree_scale: f64,
    pub collision_radius_cap: f64,
    /// None = run indefinitely.
    pub cooldown_ticks: Option<u32>,
    pub cooldown_time_ms: u64,
}

impl Default for ForceSimulationConfig {
    fn default() -> Self {
        ForceSimulationConfig {
            link_distance_base: 80.0,
            link_dampening: 0.6,
            charge_strength: -200.0,
            charge_max_distance: 400.0,
            collision_base_radius: 12.0,
            collision_degree_scale: 2.0,
            collision_radius_cap: 24.0,
            cooldown_ticks: None,
            cooldown_time_ms: 15_000,
        }
    }
}

impl ForceSimulationConfig {
    /// Rest length for an edge: similar notes sit closer together.
    pub fn link_distance(&self, similarity: f64) -> f64 {
        self.link_distance_base * (1.0 - similarity * self.link_dampening)
    }

    /// Spring strength for an edge, clamped to [0, 1].
    pub fn link_strength(&self, similarity: f64) -> f64 {
        similarity.clamp(0.0, 1.0)
    }

    /// Collision radius for a node, growing with degree up to the cap.
    pub fn collision_radius(&self, degree: usize) -> f64 {
        self.collision_base_radius
            + (degree as f64 * self.collision_degree_scale).min(self.collision_radius_cap)
    }
}

/// Capability injected by the embedding application: something that can run
/// a force simulation over the map using the supplied configuration. The
/// engine only supplies a fresh configuration when the graph changes; it
/// never ticks the simulation itself.
pub trait SimulationRunner {
    fn run(&mut self, map: &mut NeuralMap, config: &ForceSimulationConfig);
}

/// Scatter starting positions over a square that grows with the node count.
/// Seeded from the node id set, so the same graph warms up from the same
/// state while final settled positions remain up to the physics.
pub fn seed_initial_positions(nodes: &mut [GraphNode]) {
    let seed = nodes
        .iter()
        .fold(0u64, |acc, n| acc.wrapping_mul(31).wrapping_add(n.id));
    let mut rng = StdRng::seed_from_u64(seed);

    let spread = 60.0 * (nodes.len() as f64).sqrt().max(1.0);
    for node in nodes.iter_mut() {
        node.x = Some(rng.gen_range(-spread..=spread));
        node.y = Some(rng.gen_range(-spread..=spread));
        node.z = Some(0.0);
        node.vx = Some(0.0);
        node.vy = Some(0.0);
        node.vz = Some(0.0);
    }
}

// ============================================================================
// Graph Traversal Helpers
// ============================================================================

/// Adjacency lists with neighbors sorted ascending, so traversal order is
/// deterministic.
fn adjacency(edges: &[GraphEdge]) -> HashMap<u64, Vec<u64>> {
    let mut adj: HashMap<u64, Vec<u64>> = HashMap::new();
    for e in edges {
        adj.entry(e.source).or_default().push(e.target);
        adj.entry(e.target).or_default().push(e.source);
    }
    for neighbors in adj.values_mut() {
        neighbors.sort_unstable();
    }
    adj
}

/// The highest-degree node, lowest id on ties. None for an empty graph.
fn hub_node(nodes: &[GraphNode]) -> Option<u64> {
    nodes
        .iter()
        .map(|n| (n.degree, n.id))
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, id)| id)
}

/// BFS hop counts from `start`. Each node is visited once; in a cyclic
/// graph the first discovery wins.
fn bfs_hops(adj: &HashMap<u64, Vec<u64>>, start: u64) -> HashMap<u64, usize> {
    let mut hops = HashMap::new();
    let mut queue = VecDeque::new();
    hops.insert(start, 0);
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let depth = hops[&node];
        if let Some(neighbors) = adj.get(&node) {
            for &neighbor in neighbors {
                if !hops.contains_key(&neighbor) {
                    hops.insert(neighbor, depth + 1);
                    queue.push_back(neighbor);
                }
            }
        }
    }

    hops
}

// ============================================================================
// Radial Layout
// ============================================================================

const RING_SPACING: f64 = 120.0;

/// Concentric rings around the hub: ring index is the BFS hop count from
/// the hub, nodes disconnected from the hub land one ring past the deepest.
/// Within a ring, nodes are ordered by id and spread at equal angles.
pub fn radial_layout(map: &mut NeuralMap) {
    let hub = match hub_node(&map.nodes) {
        Some(h) => h,
        None => return,
    };
    let adj = adjacency(&map.edges);
    let hops = bfs_hops(&adj, hub);
    let outer_ring = hops.values().copied().max().unwrap_or(0) + 1;

    // BTreeMap keeps rings in ascending order; ids inside each ring are
    // pushed in node order and sorted below.
    let mut rings: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
    for node in &map.nodes {
        let ring = hops.get(&node.id).copied().unwrap_or(outer_ring);
        rings.entry(ring).or_default().push(node.id);
    }

    let mut positions: HashMap<u64, (f64, f64)> = HashMap::new();
    for (ring, mut ids) in rings {
        ids.sort_unstable();
        let radius = ring as f64 * RING_SPACING;
        let count = ids.len() as f64;
        for (i, id) in ids.into_iter().enumerate() {
            let angle = std::f64::consts::TAU * i as f64 / count;
            positions.insert(id, (radius * angle.cos(), radius * angle.sin()));
        }
    }

    for node in &mut map.nodes {
        if let Some(&(x, y)) = positions.get(&node.id) {
            node.x = Some(x);
            node.y = Some(y);
            node.z = Some(0.0);
            node.vx = Some(0.0);
            node.vy = Some(0.0);
            node.vz = Some(0.0);
        }
    }
}

// ============================================================================
// Tree Layout
// ============================================================================

const LEVEL_HEIGHT: f64 = 100.0;
const LEVEL_WIDTH: f64 = 800.0;

/// BFS levels below the highest-degree root, nodes at each level spread
/// evenly along the x axis.
///
/// The underlying graph may contain cycles; each node is placed at the
/// depth where BFS first discovers it and back edges are ignored. This is a
/// lossy projection of the graph onto a tree, chosen deliberately so every
/// node gets exactly one position. Nodes unreachable from the root are
/// placed on one extra level below the deepest reachable one.
pub fn tree_layout(map: &mut NeuralMap) {
    let root = match hub_node(&map.nodes) {
        Some(r) => r,
        None => return,
    };
    let adj = adjacency(&map.edges);
    let hops = bfs_hops(&adj, root);
    let orphan_level = hops.values().copied().max().unwrap_or(0) + 1;

    let mut levels: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
    for node in &map.nodes {
        let level = hops.get(&node.id).copied().unwrap_or(orphan_level);
        levels.entry(level).or_default().push(node.id);
    }

    let mut positions: HashMap<u64, (f64, f64)> = HashMap::new();
    for (level, mut ids) in levels {
        ids.sort_unstable();
        let count = ids.len() as f64;
        let y = level as f64 * LEVEL_HEIGHT;
        for (i, id) in ids.into_iter().enumerate() {
            let x = ((i as f64 + 1.0) / (count + 1.0) - 0.5) * LEVEL_WIDTH;
            positions.insert(id, (x, y));
        }
    }

    for node in &mut map.nodes {
        if let Some(&(x, y)) = positions.get(&node.id) {
            node.x = Some(x);
            node.y = Some(y);
            node.z = Some(0.0);
            node.vx = Some(0.0);
            node.vy = Some(0.0);
            node.vz = Some(0.0);
        }
    }
}
