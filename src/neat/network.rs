use super::activation::Activation;
use super::genome::{ConnKey, Genome, NodeKey};
use super::graph::feed_forward_layers;
use crate::config::GenomeConfig;
use ahash::AHashMap;

#[derive(Clone, Debug)]
struct NodeEval {
    node: NodeKey,
    activation: Activation,
    bias: f64,
    response: f64,
    links: Vec<(NodeKey, f64)>,
}

/// Phenotype of a feed-forward genome.
#[derive(Clone, Debug)]
pub struct FeedForwardNetwork {
    inputs: Vec<NodeKey>,
    outputs: Vec<NodeKey>,
    evals: Vec<NodeEval>,
}

impl FeedForwardNetwork {
    pub fn create(genome: &Genome, config: &GenomeConfig) -> Self {
        let inputs = Genome::input_keys(config);
        let outputs = Genome::output_keys(config);
        let enabled: Vec<ConnKey> = genome.connections.values().filter(|c| c.enabled).map(|c| c.key).collect();

        let mut evals = Vec::new();
        for layer in feed_forward_layers(&inputs, &outputs, &enabled) {
            for node in layer {
                let links: Vec<(NodeKey, f64)> = genome
                    .connections
                    .values()
                    .filter(|c| c.enabled && c.key.1 == node)
                    .map(|c| (c.key.0, c.weight))
                    .collect();
                let Some(gene) = genome.nodes.get(&node) else { continue };
                evals.push(NodeEval {
                    node,
                    activation: gene.activation,
                    bias: gene.bias,
                    response: gene.response,
                    links,
                });
            }
        }
        Self { inputs, outputs, evals }
    }

    /// One value per output node. Outputs with no path from an input read 0.
    ///
    /// # Panics
    /// If `values.len()` differs from the configured number of inputs.
    pub fn activate(&self, values: &[f64]) -> Vec<f64> {
        assert_eq!(
            values.len(),
            self.inputs.len(),
            "network expects {} inputs, got {}",
            self.inputs.len(),
            values.len()
        );
        let mut state: AHashMap<NodeKey, f64> = AHashMap::with_capacity(self.inputs.len() + self.evals.len());
        for &k in &self.outputs {
            state.insert(k, 0.0);
        }
        for (&k, &v) in self.inputs.iter().zip(values) {
            state.insert(k, v);
        }
        for eval in &self.evals {
            let sum: f64 = eval
                .links
                .iter()
                .map(|(from, w)| state.get(from).copied().unwrap_or(0.0) * w)
                .sum();
            let value = eval.activation.apply(eval.bias + eval.response * sum);
            state.insert(eval.node, value);
        }
        self.outputs.iter().map(|k| state.get(k).copied().unwrap_or(0.0)).collect()
    }

    pub fn num_evaluated_nodes(&self) -> usize {
        self.evals.len()
    }
}
