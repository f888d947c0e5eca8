//! Directed-graph helpers over connection keys `(from, to)`.

use super::genome::{ConnKey, NodeKey};
use ahash::AHashSet;

/// True if adding `test` to `connections` would close a cycle.
pub fn creates_cycle(connections: &[ConnKey], test: ConnKey) -> bool {
    let (from, to) = test;
    if from == to {
        return true;
    }
    let mut visited: AHashSet<NodeKey> = AHashSet::new();
    visited.insert(to);
    loop {
        let mut added = 0;
        for &(a, b) in connections {
            if visited.contains(&a) && !visited.contains(&b) {
                if b == from {
                    return true;
                }
                visited.insert(b);
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
    }
}

/// Nodes whose value can reach an output. Inputs are never included.
pub fn required_for_output(inputs: &[NodeKey], outputs: &[NodeKey], connections: &[ConnKey]) -> AHashSet<NodeKey> {
    let inputs: AHashSet<NodeKey> = inputs.iter().copied().collect();
    let mut required: AHashSet<NodeKey> = outputs.iter().copied().collect();
    let mut seen = required.clone();
    loop {
        let frontier: AHashSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| seen.contains(b) && !seen.contains(a))
            .map(|&(a, _)| a)
            .collect();
        if frontier.is_empty() {
            break;
        }
        let layer: Vec<NodeKey> = frontier.iter().copied().filter(|n| !inputs.contains(n)).collect();
        if layer.is_empty() {
            break;
        }
        required.extend(layer);
        seen.extend(frontier);
    }
    required
}

/// Groups the required nodes into layers that can be evaluated in order.
/// Each layer's nodes depend only on inputs and earlier layers; within a
/// layer nodes are sorted by key.
pub fn feed_forward_layers(inputs: &[NodeKey], outputs: &[NodeKey], connections: &[ConnKey]) -> Vec<Vec<NodeKey>> {
    let required = required_for_output(inputs, outputs, connections);
    let mut evaluated: AHashSet<NodeKey> = inputs.iter().copied().collect();
    let mut layers = Vec::new();
    loop {
        let candidates: AHashSet<NodeKey> = connections
            .iter()
            .filter(|(a, b)| evaluated.contains(a) && !evaluated.contains(b))
            .map(|&(_, b)| b)
            .collect();
        let mut layer: Vec<NodeKey> = candidates
            .into_iter()
            .filter(|n| {
                required.contains(n)
                    && connections
                        .iter()
                        .filter(|(_, b)| b == n)
                        .all(|(a, _)| evaluated.contains(a))
            })
            .collect();
        if layer.is_empty() {
            break;
        }
        layer.sort_unstable();
        evaluated.extend(layer.iter().copied());
        layers.push(layer);
    }
    layers
}
