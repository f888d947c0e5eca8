use super::activation::Activation;
use super::graph::creates_cycle;
use crate::config::{FloatAttr, GenomeConfig, InitialConnection};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeKey = i64;
pub type ConnKey = (NodeKey, NodeKey);
pub type GenomeKey = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub key: NodeKey,
    pub bias: f64,
    pub response: f64,
    pub activation: Activation,
}

impl NodeGene {
    fn new<R: Rng>(key: NodeKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self {
            key,
            bias: init_value(&config.bias, rng),
            response: init_value(&config.response, rng),
            activation: config.activation_default,
        }
    }

    fn mutate<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.bias = mutate_value(self.bias, &config.bias, rng);
        self.response = mutate_value(self.response, &config.response, rng);
        if rng.gen_bool(config.activation_mutate_rate) {
            if let Some(a) = config.activation_options.choose(rng) {
                self.activation = *a;
            }
        }
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        Self {
            key: self.key,
            bias: pick(self.bias, other.bias, rng),
            response: pick(self.response, other.response, rng),
            activation: pick(self.activation, other.activation, rng),
        }
    }

    fn distance(&self, other: &Self, config: &GenomeConfig) -> f64 {
        let mut d = (self.bias - other.bias).abs() + (self.response - other.response).abs();
        if self.activation != other.activation {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub key: ConnKey,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    fn new<R: Rng>(key: ConnKey, config: &GenomeConfig, rng: &mut R) -> Self {
        Self { key, weight: init_value(&config.weight, rng), enabled: config.enabled_default }
    }

    fn mutate<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        self.weight = mutate_value(self.weight, &config.weight, rng);
        if rng.gen_bool(config.enabled_mutate_rate) {
            self.enabled = rng.gen_bool(0.5);
        }
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        Self {
            key: self.key,
            weight: pick(self.weight, other.weight, rng),
            enabled: pick(self.enabled, other.enabled, rng),
        }
    }

    fn distance(&self, other: &Self, config: &GenomeConfig) -> f64 {
        let mut d = (self.weight - other.weight).abs();
        if self.enabled != other.enabled {
            d += 1.0;
        }
        d * config.compatibility_weight_coefficient
    }
}

/// Hands out keys for new hidden nodes, shared by the whole population so
/// the same split never collides across genomes.
#[derive(Clone, Debug)]
pub struct NodeIndexer {
    next: NodeKey,
}

impl NodeIndexer {
    pub fn new(config: &GenomeConfig) -> Self {
        Self { next: config.num_outputs as NodeKey }
    }

    pub fn next_key(&mut self, genome: &Genome) -> NodeKey {
        let floor = genome.nodes.keys().next_back().map_or(0, |k| k + 1);
        self.next = self.next.max(floor);
        let key = self.next;
        self.next += 1;
        key
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub key: GenomeKey,
    pub nodes: BTreeMap<NodeKey, NodeGene>,
    #[serde(with = "connection_list")]
    pub connections: BTreeMap<ConnKey, ConnectionGene>,
    pub fitness: Option<f64>,
}

impl Genome {
    pub fn input_keys(config: &GenomeConfig) -> Vec<NodeKey> {
        (1..=config.num_inputs as NodeKey).map(|i| -i).collect()
    }

    pub fn output_keys(config: &GenomeConfig) -> Vec<NodeKey> {
        (0..config.num_outputs as NodeKey).collect()
    }

    pub fn empty(key: GenomeKey) -> Self {
        Self { key, nodes: BTreeMap::new(), connections: BTreeMap::new(), fitness: None }
    }

    /// A fresh genome for the first generation.
    pub fn new_initial<R: Rng>(key: GenomeKey, config: &GenomeConfig, indexer: &mut NodeIndexer, rng: &mut R) -> Self {
        let mut g = Self::empty(key);
        let outputs = Self::output_keys(config);
        for &k in &outputs {
            g.nodes.insert(k, NodeGene::new(k, config, rng));
        }
        let mut hidden = Vec::with_capacity(config.num_hidden);
        for _ in 0..config.num_hidden {
            let k = indexer.next_key(&g);
            g.nodes.insert(k, NodeGene::new(k, config, rng));
            hidden.push(k);
        }

        if config.initial_connection == InitialConnection::Full {
            let inputs = Self::input_keys(config);
            let pairs: Vec<ConnKey> = if hidden.is_empty() {
                inputs.iter().flat_map(|&i| outputs.iter().map(move |&o| (i, o))).collect()
            } else {
                let to_hidden = inputs.iter().flat_map(|&i| hidden.iter().map(move |&h| (i, h)));
                let to_output = hidden.iter().flat_map(|&h| outputs.iter().map(move |&o| (h, o)));
                to_hidden.chain(to_output).collect()
            };
            for key in pairs {
                g.connections.insert(key, ConnectionGene::new(key, config, rng));
            }
        }
        g
    }

    /// Child of two parents; genes missing from the fitter parent are dropped.
    pub fn crossover<R: Rng>(key: GenomeKey, a: &Genome, b: &Genome, rng: &mut R) -> Self {
        let (fit, other) = if b.fitness.unwrap_or(f64::MIN) > a.fitness.unwrap_or(f64::MIN) { (b, a) } else { (a, b) };
        let mut child = Self::empty(key);
        for (k, gene) in &fit.connections {
            let g = match other.connections.get(k) {
                Some(o) => gene.crossover(o, rng),
                None => gene.clone(),
            };
            child.connections.insert(*k, g);
        }
        for (k, gene) in &fit.nodes {
            let g = match other.nodes.get(k) {
                Some(o) => gene.crossover(o, rng),
                None => gene.clone(),
            };
            child.nodes.insert(*k, g);
        }
        child
    }

    pub fn mutate<R: Rng>(&mut self, config: &GenomeConfig, indexer: &mut NodeIndexer, rng: &mut R) {
        if rng.gen_bool(config.node_add_prob) {
            self.mutate_add_node(config, indexer, rng);
        }
        if rng.gen_bool(config.node_delete_prob) {
            self.mutate_delete_node(config, rng);
        }
        if rng.gen_bool(config.conn_add_prob) {
            self.mutate_add_connection(config, rng);
        }
        if rng.gen_bool(config.conn_delete_prob) {
            self.mutate_delete_connection(rng);
        }
        for conn in self.connections.values_mut() {
            conn.mutate(config, rng);
        }
        for node in self.nodes.values_mut() {
            node.mutate(config, rng);
        }
    }

    /// Splits a random connection `a -> b` into `a -> new -> b`.
    pub fn mutate_add_node<R: Rng>(&mut self, config: &GenomeConfig, indexer: &mut NodeIndexer, rng: &mut R) {
        if self.connections.is_empty() {
            return;
        }
        let idx = rng.gen_range(0..self.connections.len());
        let Some((&(from, to), _)) = self.connections.iter().nth(idx) else {
            return;
        };
        let new_key = indexer.next_key(self);
        self.nodes.insert(new_key, NodeGene::new(new_key, config, rng));

        let old_weight = match self.connections.get_mut(&(from, to)) {
            Some(conn) => {
                conn.enabled = false;
                conn.weight
            }
            None => return,
        };
        self.connections.insert((from, new_key), ConnectionGene { key: (from, new_key), weight: 1.0, enabled: true });
        self.connections.insert((new_key, to), ConnectionGene { key: (new_key, to), weight: old_weight, enabled: true });
    }

    pub fn mutate_delete_node<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let outputs = Self::output_keys(config);
        let hidden: Vec<NodeKey> = self.nodes.keys().copied().filter(|k| !outputs.contains(k)).collect();
        let Some(&victim) = hidden.choose(rng) else {
            return;
        };
        self.connections.retain(|&(a, b), _| a != victim && b != victim);
        self.nodes.remove(&victim);
    }

    pub fn mutate_add_connection<R: Rng>(&mut self, config: &GenomeConfig, rng: &mut R) {
        let possible_outputs: Vec<NodeKey> = self.nodes.keys().copied().collect();
        let mut possible_inputs = possible_outputs.clone();
        possible_inputs.extend(Self::input_keys(config));
        let (Some(&to), Some(&from)) = (possible_outputs.choose(rng), possible_inputs.choose(rng)) else {
            return;
        };
        let key = (from, to);
        if self.connections.contains_key(&key) {
            return;
        }
        let outputs = Self::output_keys(config);
        if outputs.contains(&from) && outputs.contains(&to) {
            return;
        }
        if config.feed_forward {
            let existing: Vec<ConnKey> = self.connections.keys().copied().collect();
            if creates_cycle(&existing, key) {
                return;
            }
        }
        self.connections.insert(key, ConnectionGene::new(key, config, rng));
    }

    pub fn mutate_delete_connection<R: Rng>(&mut self, rng: &mut R) {
        if self.connections.is_empty() {
            return;
        }
        let idx = rng.gen_range(0..self.connections.len());
        if let Some(key) = self.connections.keys().nth(idx).copied() {
            self.connections.remove(&key);
        }
    }

    /// Compatibility distance used for speciation.
    pub fn distance(&self, other: &Genome, config: &GenomeConfig) -> f64 {
        let node_distance = gene_distance(&self.nodes, &other.nodes, config, NodeGene::distance);
        let conn_distance = gene_distance(&self.connections, &other.connections, config, ConnectionGene::distance);
        node_distance + conn_distance
    }

    /// `(nodes, enabled connections)`
    pub fn size(&self) -> (usize, usize) {
        (self.nodes.len(), self.connections.values().filter(|c| c.enabled).count())
    }
}

fn gene_distance<K: Ord, G>(
    a: &BTreeMap<K, G>,
    b: &BTreeMap<K, G>,
    config: &GenomeConfig,
    homologous: fn(&G, &G, &GenomeConfig) -> f64,
) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    let mut disjoint = 0usize;
    let mut shared = 0.0;
    for (k, ga) in a {
        match b.get(k) {
            Some(gb) => shared += homologous(ga, gb, config),
            None => disjoint += 1,
        }
    }
    disjoint += b.keys().filter(|k| !a.contains_key(k)).count();
    (shared + config.compatibility_disjoint_coefficient * disjoint as f64) / longest as f64
}

fn pick<T, R: Rng>(a: T, b: T, rng: &mut R) -> T {
    if rng.gen_bool(0.5) { a } else { b }
}

fn gauss<R: Rng>(mean: f64, stdev: f64, rng: &mut R) -> f64 {
    match Normal::new(mean, stdev) {
        Ok(n) if stdev > 0.0 => n.sample(rng),
        _ => mean,
    }
}

fn init_value<R: Rng>(attr: &FloatAttr, rng: &mut R) -> f64 {
    gauss(attr.init_mean, attr.init_stdev, rng).clamp(attr.min_value, attr.max_value)
}

fn mutate_value<R: Rng>(value: f64, attr: &FloatAttr, rng: &mut R) -> f64 {
    let r: f64 = rng.r#gen();
    if r < attr.mutate_rate {
        (value + gauss(0.0, attr.mutate_power, rng)).clamp(attr.min_value, attr.max_value)
    } else if r < attr.mutate_rate + attr.replace_rate {
        init_value(attr, rng)
    } else {
        value
    }
}

/// JSON maps need string keys, so connections serialize as a plain list.
mod connection_list {
    use super::{ConnKey, ConnectionGene};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(map: &BTreeMap<ConnKey, ConnectionGene>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(map.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<ConnKey, ConnectionGene>, D::Error> {
        let list = Vec::<ConnectionGene>::deserialize(d)?;
        Ok(list.into_iter().map(|c| (c.key, c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn cfg() -> GenomeConfig {
        GenomeConfig::default()
    }

    #[test]
    fn initial_full_genome_connects_every_input_to_output() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(1);
        let g = Genome::new_initial(1, &config, &mut idx, &mut rng);
        assert_eq!(g.nodes.keys().copied().collect::<Vec<_>>(), vec![0]);
        let keys: Vec<ConnKey> = g.connections.keys().copied().collect();
        assert_eq!(keys, vec![(-3, 0), (-2, 0), (-1, 0)]);
        assert!(g.connections.values().all(|c| c.enabled));
    }

    #[test]
    fn initial_hidden_nodes_sit_between_inputs_and_outputs() {
        let config = GenomeConfig { num_hidden: 2, ..cfg() };
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(2);
        let g = Genome::new_initial(1, &config, &mut idx, &mut rng);
        assert_eq!(g.nodes.len(), 3);
        assert_eq!(g.connections.len(), 3 * 2 + 2);
        assert!(g.connections.contains_key(&(-1, 1)));
        assert!(g.connections.contains_key(&(2, 0)));
        assert!(!g.connections.contains_key(&(-1, 0)));
    }

    #[test]
    fn add_node_splits_a_connection() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut g = Genome::new_initial(1, &config, &mut idx, &mut rng);
        g.mutate_add_node(&config, &mut idx, &mut rng);
        assert_eq!(g.nodes.len(), 2);
        let new_key = 1;
        assert!(g.nodes.contains_key(&new_key));
        let disabled: Vec<_> = g.connections.values().filter(|c| !c.enabled).collect();
        assert_eq!(disabled.len(), 1);
        let (from, to) = disabled[0].key;
        assert_eq!(g.connections[&(from, new_key)].weight, 1.0);
        assert_eq!(g.connections[&(new_key, to)].weight, disabled[0].weight);
    }

    #[test]
    fn delete_node_drops_its_connections_but_never_outputs() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut g = Genome::new_initial(1, &config, &mut idx, &mut rng);
        g.mutate_delete_node(&config, &mut rng);
        assert!(g.nodes.contains_key(&0));
        g.mutate_add_node(&config, &mut idx, &mut rng);
        g.mutate_delete_node(&config, &mut rng);
        assert_eq!(g.nodes.len(), 1);
        assert!(g.connections.keys().all(|&(a, b)| a != 1 && b != 1));
    }

    #[test]
    fn structural_mutation_keeps_graph_acyclic() {
        let config = GenomeConfig { node_add_prob: 0.5, conn_add_prob: 0.9, conn_delete_prob: 0.1, node_delete_prob: 0.1, ..cfg() };
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut g = Genome::new_initial(1, &config, &mut idx, &mut rng);
        for _ in 0..300 {
            g.mutate(&config, &mut idx, &mut rng);
        }
        let conns: Vec<ConnKey> = g.connections.keys().copied().collect();
        for (i, &c) in conns.iter().enumerate() {
            let others: Vec<ConnKey> = conns.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, &k)| k).collect();
            assert!(!creates_cycle(&others, c), "connection {c:?} closes a cycle");
        }
        for w in g.connections.values().map(|c| c.weight) {
            assert!((-30.0..=30.0).contains(&w));
        }
    }

    #[test]
    fn crossover_follows_fitter_parent_structure() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(6);
        let mut a = Genome::new_initial(1, &config, &mut idx, &mut rng);
        let mut b = a.clone();
        b.key = 2;
        b.mutate_add_node(&config, &mut idx, &mut rng);
        a.fitness = Some(1.0);
        b.fitness = Some(5.0);
        let child = Genome::crossover(3, &a, &b, &mut rng);
        assert_eq!(child.key, 3);
        assert_eq!(child.nodes.keys().collect::<Vec<_>>(), b.nodes.keys().collect::<Vec<_>>());
        assert_eq!(child.connections.len(), b.connections.len());
        assert_eq!(child.fitness, None);
    }

    #[test]
    fn distance_is_zero_to_self_and_symmetric() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(7);
        let a = Genome::new_initial(1, &config, &mut idx, &mut rng);
        let mut b = Genome::new_initial(2, &config, &mut idx, &mut rng);
        b.mutate_add_node(&config, &mut idx, &mut rng);
        assert_eq!(a.distance(&a, &config), 0.0);
        let d1 = a.distance(&b, &config);
        let d2 = b.distance(&a, &config);
        assert!(d1 > 0.0);
        assert!((d1 - d2).abs() < 1e-12);
    }

    #[test]
    fn genome_serializes_to_json_and_back() {
        let config = cfg();
        let mut idx = NodeIndexer::new(&config);
        let mut rng = SmallRng::seed_from_u64(8);
        let mut g = Genome::new_initial(9, &config, &mut idx, &mut rng);
        g.mutate_add_node(&config, &mut idx, &mut rng);
        g.fitness = Some(12.5);
        let text = serde_json::to_string(&g).unwrap();
        let back: Genome = serde_json::from_str(&text).unwrap();
        assert_eq!(back, g);
    }
}
