//! Direct network genomes.
//!
//! A [`NetworkGenome`] stores node and link genes in owned, ordered vectors.
//! Links name their endpoints by innovation number, so the genome can be
//! cloned, crossed and decoded without any pointer fix-up. Structural
//! mutations only add genes or disable links; nothing is ever removed.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::activation::Activation;
use crate::error::{GenotypeError, GenotypeResult};
use crate::gene::{LinkGene, NeuronType, NodeGene};
use crate::genotype::{Genotype, GenotypeKind};
use crate::network::Network;
use crate::registry::{IdentityRegistry, RESERVED_INNOVATIONS};

/// How matching link genes are inherited during crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CrossoverPolicy {
    /// Take the gene from either parent with equal probability.
    #[default]
    RandomPick,
    /// Average the two parents' weights.
    Blend,
}

/// Configuration for genome creation and mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeatConfig {
    /// Number of input nodes.
    pub num_inputs: usize,
    /// Number of output nodes per output module.
    pub num_outputs: usize,
    /// Number of output modules in a freshly initialized genome.
    pub num_modules: usize,
    /// Activation for output nodes.
    pub output_activation: Activation,
    /// Activations to choose from for hidden nodes.
    pub hidden_activations: Vec<Activation>,
    /// Probability of adding a link during mutation.
    pub add_link_prob: f64,
    /// Probability of splitting a link during mutation.
    pub add_node_prob: f64,
    /// Per-link probability of a weight mutation.
    pub weight_mutation_prob: f64,
    /// Maximum magnitude of a weight perturbation.
    pub weight_mutation_power: f64,
    /// Probability that a weight mutation replaces instead of perturbs.
    pub weight_replace_prob: f64,
    /// Range for initial and replaced weights: [-weight_range, weight_range].
    pub weight_range: f64,
    /// Per-link probability of disabling an enabled link.
    pub disable_link_prob: f64,
    /// Per-node probability of changing a hidden node's activation.
    pub activation_mutation_prob: f64,
    pub crossover_policy: CrossoverPolicy,
    /// Probability that a matching link disabled in either parent stays disabled.
    pub disabled_inheritance_prob: f64,
    pub compatibility_excess_coeff: f64,
    pub compatibility_disjoint_coeff: f64,
    pub compatibility_weight_coeff: f64,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            num_inputs: 2,
            num_outputs: 1,
            num_modules: 1,
            output_activation: Activation::Tanh,
            hidden_activations: vec![Activation::Tanh],
            add_link_prob: 0.05,
            add_node_prob: 0.03,
            weight_mutation_prob: 0.8,
            weight_mutation_power: 0.5,
            weight_replace_prob: 0.1,
            weight_range: 1.0,
            disable_link_prob: 0.01,
            activation_mutation_prob: 0.1,
            crossover_policy: CrossoverPolicy::RandomPick,
            disabled_inheritance_prob: 0.75,
            compatibility_excess_coeff: 1.0,
            compatibility_disjoint_coeff: 1.0,
            compatibility_weight_coeff: 0.4,
        }
    }
}

impl NeatConfig {
    /// Config for pattern-producing networks with CPPN activations.
    #[must_use]
    pub fn cppn(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs,
            num_outputs,
            output_activation: Activation::Tanh,
            hidden_activations: Activation::CPPN.to_vec(),
            ..Default::default()
        }
    }

    /// Config for plain controller networks.
    #[must_use]
    pub fn minimal(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs,
            num_outputs,
            output_activation: Activation::Sigmoid,
            hidden_activations: vec![Activation::Sigmoid, Activation::Tanh],
            ..Default::default()
        }
    }

    fn random_weight<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.random::<f64>() * 2.0 * self.weight_range - self.weight_range
    }
}

/// NEAT-style genome: ordered node and link genes keyed by innovation number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkGenome {
    id: u64,
    pub nodes: Vec<NodeGene>,
    pub links: Vec<LinkGene>,
    neurons_per_module: usize,
    module_usage: Vec<u32>,
    archetype: i32,
    #[serde(default)]
    pub config: NeatConfig,
}

impl NetworkGenome {
    /// Create a randomly weighted genome with every input linked to every output.
    ///
    /// Input nodes get innovations `0..num_inputs`, output nodes follow. Links
    /// take their innovation from the registry's history for `archetype`, so
    /// every genome initialized this way within one archetype is aligned.
    #[must_use]
    pub fn random<R: Rng>(
        config: NeatConfig,
        archetype: i32,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> Self {
        let total_outputs = config.num_outputs * config.num_modules;
        debug_assert!(
            ((config.num_inputs + total_outputs) as u64) < RESERVED_INNOVATIONS,
            "fixed node innovations overflow the reserved range"
        );

        let mut nodes = Vec::with_capacity(config.num_inputs + total_outputs);
        for i in 0..config.num_inputs {
            nodes.push(NodeGene::input(i as u64));
        }
        for j in 0..total_outputs {
            let innovation = (config.num_inputs + j) as u64;
            nodes.push(NodeGene::output(innovation, config.output_activation));
        }

        let mut links = Vec::with_capacity(config.num_inputs * total_outputs);
        for source in 0..config.num_inputs as u64 {
            for j in 0..total_outputs {
                let target = (config.num_inputs + j) as u64;
                let innovation = registry.link_innovation(archetype, source, target);
                links.push(LinkGene::new(
                    source,
                    target,
                    config.random_weight(rng),
                    innovation,
                ));
            }
        }

        Self {
            id: registry.next_genotype_id(),
            nodes,
            links,
            neurons_per_module: config.num_outputs,
            module_usage: vec![0; config.num_modules],
            archetype,
            config,
        }
    }

    /// Assemble a genome from existing genes.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::StructuralInvariantViolation`] for duplicate
    /// innovations, links naming unknown nodes, or an output count that does
    /// not divide into modules of `neurons_per_module`.
    pub fn from_genes(
        id: u64,
        nodes: Vec<NodeGene>,
        links: Vec<LinkGene>,
        neurons_per_module: usize,
        archetype: i32,
        config: NeatConfig,
    ) -> GenotypeResult<Self> {
        let outputs = nodes
            .iter()
            .filter(|n| n.neuron_type == NeuronType::Output)
            .count();
        let num_modules = match outputs.checked_div(neurons_per_module) {
            Some(modules) if modules * neurons_per_module == outputs => modules,
            _ => {
                return Err(GenotypeError::StructuralInvariantViolation(format!(
                    "{} output nodes do not form modules of {}",
                    outputs, neurons_per_module
                )))
            }
        };

        let genome = Self {
            id,
            nodes,
            links,
            neurons_per_module,
            module_usage: vec![0; num_modules],
            archetype,
            config,
        };
        genome.validate()?;
        Ok(genome)
    }

    /// Check innovation uniqueness and link endpoint resolution.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::StructuralInvariantViolation`] describing the
    /// first offending gene.
    pub fn validate(&self) -> GenotypeResult<()> {
        let mut node_innovations = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node_innovations.insert(node.innovation) {
                return Err(GenotypeError::StructuralInvariantViolation(format!(
                    "duplicate node innovation {}",
                    node.innovation
                )));
            }
        }

        let mut link_innovations = HashSet::with_capacity(self.links.len());
        for link in &self.links {
            if !link_innovations.insert(link.innovation) {
                return Err(GenotypeError::StructuralInvariantViolation(format!(
                    "duplicate link innovation {}",
                    link.innovation
                )));
            }
            for endpoint in [link.source, link.target] {
                if !node_innovations.contains(&endpoint) {
                    return Err(GenotypeError::StructuralInvariantViolation(format!(
                        "link {} references missing node {}",
                        link.innovation, endpoint
                    )));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn archetype(&self) -> i32 {
        self.archetype
    }

    /// Output neurons per module.
    #[must_use]
    pub const fn neurons_per_module(&self) -> usize {
        self.neurons_per_module
    }

    #[must_use]
    pub fn num_modules(&self) -> usize {
        self.module_usage.len()
    }

    /// How often each output module was selected during evaluation.
    #[must_use]
    pub fn module_usage(&self) -> &[u32] {
        &self.module_usage
    }

    /// Store usage counts reported by an evaluated phenotype.
    ///
    /// # Panics
    ///
    /// Panics if `usage` does not have one entry per module.
    pub fn record_module_usage(&mut self, usage: &[u32]) {
        assert_eq!(
            usage.len(),
            self.module_usage.len(),
            "module usage length mismatch"
        );
        self.module_usage.copy_from_slice(usage);
    }

    #[must_use]
    pub fn num_enabled_links(&self) -> usize {
        self.links.iter().filter(|l| l.enabled).count()
    }

    #[must_use]
    pub fn find_node(&self, innovation: u64) -> Option<&NodeGene> {
        self.nodes.iter().find(|n| n.innovation == innovation)
    }

    #[must_use]
    pub fn find_link(&self, innovation: u64) -> Option<&LinkGene> {
        self.links.iter().find(|l| l.innovation == innovation)
    }

    /// Add a link from node `source` to node `target`.
    ///
    /// Returns the new link's innovation, or `None` if either node is missing
    /// or disabled, the target is an input, the source is an output, the pair
    /// is already linked, or the link would close a cycle.
    pub fn add_link<R: Rng>(
        &mut self,
        source: u64,
        target: u64,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> Option<u64> {
        let source_node = self.find_node(source)?;
        let target_node = self.find_node(target)?;
        if !source_node.enabled || !target_node.enabled {
            return None;
        }
        if target_node.neuron_type == NeuronType::Input
            || source_node.neuron_type == NeuronType::Output
        {
            return None;
        }
        if self
            .links
            .iter()
            .any(|l| l.source == source && l.target == target)
        {
            return None;
        }
        if self.would_create_cycle(source, target) {
            return None;
        }

        let innovation = self.link_innovation(registry, source, target);
        let weight = self.config.random_weight(rng);
        self.links
            .push(LinkGene::new(source, target, weight, innovation));
        trace!(
            "genome {}: added link {} -> {} ({})",
            self.id, source, target, innovation
        );
        Some(innovation)
    }

    /// Split the link at `link_index` with a new hidden node.
    ///
    /// The original link is disabled; the new node is fed by a weight-1.0 link
    /// from the old source and feeds the old target with the old weight. The
    /// node is inserted before the first output gene. Returns the node's
    /// innovation, or `None` if the link is missing or disabled, or no hidden
    /// activations are configured.
    pub fn add_node<R: Rng>(
        &mut self,
        link_index: usize,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> Option<u64> {
        if self.config.hidden_activations.is_empty() {
            return None;
        }
        let link = self.links.get(link_index)?;
        if !link.enabled {
            return None;
        }
        let (source, target, weight, split) =
            (link.source, link.target, link.weight, link.innovation);

        let mut node_innovation = registry.split_innovation(self.archetype, split);
        // The same link was split before and later re-enabled, or the
        // registry counter was reset below innovations already in use.
        while self.find_node(node_innovation).is_some() {
            node_innovation = registry.next_innovation();
        }
        let activation = self.config.hidden_activations
            [rng.random_range(0..self.config.hidden_activations.len())];

        let position = self
            .nodes
            .iter()
            .position(|n| n.neuron_type == NeuronType::Output)
            .unwrap_or(self.nodes.len());
        self.nodes
            .insert(position, NodeGene::hidden(node_innovation, activation));

        self.links[link_index].enabled = false;
        let into = self.link_innovation(registry, source, node_innovation);
        self.links
            .push(LinkGene::new(source, node_innovation, 1.0, into));
        let out = self.link_innovation(registry, node_innovation, target);
        self.links
            .push(LinkGene::new(node_innovation, target, weight, out));

        trace!(
            "genome {}: split link {} with node {}",
            self.id, split, node_innovation
        );
        Some(node_innovation)
    }

    /// Registry innovation for a new link, drawing fresh numbers while the
    /// candidate is already present in this genome.
    fn link_innovation(&self, registry: &IdentityRegistry, source: u64, target: u64) -> u64 {
        let mut innovation = registry.link_innovation(self.archetype, source, target);
        while self.find_link(innovation).is_some() {
            innovation = registry.next_innovation();
        }
        innovation
    }

    /// Whether a link `source -> target` would close a cycle.
    ///
    /// Disabled links count too, so re-enabling a link through crossover can
    /// never introduce recurrence.
    fn would_create_cycle(&self, source: u64, target: u64) -> bool {
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![target];

        while let Some(current) = stack.pop() {
            if current == source {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.links
                    .iter()
                    .filter(|l| l.source == current)
                    .map(|l| l.target),
            );
        }
        false
    }

    /// Compatibility distance for speciation (excess, disjoint, weight terms).
    #[must_use]
    pub fn compatibility_distance(&self, other: &NetworkGenome) -> f64 {
        let ours: HashMap<u64, f64> = self
            .links
            .iter()
            .map(|l| (l.innovation, l.weight))
            .collect();
        let theirs: HashMap<u64, f64> = other
            .links
            .iter()
            .map(|l| (l.innovation, l.weight))
            .collect();
        let our_max = ours.keys().copied().max().unwrap_or(0);
        let their_max = theirs.keys().copied().max().unwrap_or(0);

        let mut matching = 0usize;
        let mut disjoint = 0usize;
        let mut excess = 0usize;
        let mut weight_diff_sum = 0.0;

        for (innovation, weight) in &ours {
            match theirs.get(innovation) {
                Some(w) => {
                    matching += 1;
                    weight_diff_sum += (weight - w).abs();
                }
                None if *innovation > their_max => excess += 1,
                None => disjoint += 1,
            }
        }
        for innovation in theirs.keys().filter(|i| !ours.contains_key(*i)) {
            if *innovation > our_max {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }

        let n = self.links.len().max(other.links.len()).max(1) as f64;
        let avg_weight_diff = if matching > 0 {
            weight_diff_sum / matching as f64
        } else {
            0.0
        };

        (self.config.compatibility_excess_coeff * excess as f64 / n)
            + (self.config.compatibility_disjoint_coeff * disjoint as f64 / n)
            + (self.config.compatibility_weight_coeff * avg_weight_diff)
    }

    fn mutate_weights<R: Rng>(&mut self, rng: &mut R) {
        let limit = self.config.weight_range * 10.0;
        for link in &mut self.links {
            if rng.random::<f64>() < self.config.weight_mutation_prob {
                if rng.random::<f64>() < self.config.weight_replace_prob {
                    link.weight = self.config.random_weight(rng);
                } else {
                    link.weight +=
                        (rng.random::<f64>() * 2.0 - 1.0) * self.config.weight_mutation_power;
                }
                link.weight = link.weight.clamp(-limit, limit);
            }
        }
    }

    fn mutate_activations<R: Rng>(&mut self, rng: &mut R) {
        if self.config.hidden_activations.is_empty() {
            return;
        }
        for node in &mut self.nodes {
            if node.neuron_type == NeuronType::Hidden
                && rng.random::<f64>() < self.config.activation_mutation_prob
            {
                node.activation = self.config.hidden_activations
                    [rng.random_range(0..self.config.hidden_activations.len())];
            }
        }
    }

    fn mutate_disable_links<R: Rng>(&mut self, rng: &mut R) {
        for link in self.links.iter_mut().filter(|l| l.enabled) {
            if rng.random::<f64>() < self.config.disable_link_prob {
                link.enabled = false;
            }
        }
    }

    fn mutate_add_link<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        if rng.random::<f64>() >= self.config.add_link_prob {
            return;
        }

        let sources: Vec<u64> = self
            .nodes
            .iter()
            .filter(|n| n.enabled && n.neuron_type != NeuronType::Output)
            .map(|n| n.innovation)
            .collect();
        let targets: Vec<u64> = self
            .nodes
            .iter()
            .filter(|n| n.enabled && n.neuron_type != NeuronType::Input)
            .map(|n| n.innovation)
            .collect();
        if sources.is_empty() || targets.is_empty() {
            return;
        }

        for _ in 0..10 {
            let source = sources[rng.random_range(0..sources.len())];
            let target = targets[rng.random_range(0..targets.len())];
            if self.add_link(source, target, registry, rng).is_some() {
                return;
            }
        }
    }

    fn mutate_add_node<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        if rng.random::<f64>() >= self.config.add_node_prob {
            return;
        }

        let enabled: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.enabled)
            .map(|(i, _)| i)
            .collect();
        if enabled.is_empty() {
            return;
        }
        let index = enabled[rng.random_range(0..enabled.len())];
        self.add_node(index, registry, rng);
    }
}

impl Genotype for NetworkGenome {
    type Phenotype = Network;

    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> GenotypeKind {
        GenotypeKind::Direct
    }

    fn mutate<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        self.mutate_weights(rng);
        self.mutate_activations(rng);
        self.mutate_disable_links(rng);
        self.mutate_add_link(registry, rng);
        self.mutate_add_node(registry, rng);
    }

    /// Align links by innovation; `self` is the designated parent whose
    /// disjoint and excess genes (and node genes) the child inherits.
    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self> {
        if self.archetype != other.archetype {
            return Err(GenotypeError::ArchetypeMismatch {
                ours: self.archetype,
                theirs: other.archetype,
            });
        }

        let their_links: HashMap<u64, &LinkGene> =
            other.links.iter().map(|l| (l.innovation, l)).collect();
        let their_nodes: HashMap<u64, &NodeGene> =
            other.nodes.iter().map(|n| (n.innovation, n)).collect();

        let links = self
            .links
            .iter()
            .map(|ours| {
                let Some(theirs) = their_links.get(&ours.innovation) else {
                    return ours.clone();
                };
                let mut child = match self.config.crossover_policy {
                    CrossoverPolicy::RandomPick if rng.random::<bool>() => (*theirs).clone(),
                    CrossoverPolicy::RandomPick => ours.clone(),
                    CrossoverPolicy::Blend => LinkGene {
                        weight: (ours.weight + theirs.weight) / 2.0,
                        ..ours.clone()
                    },
                };
                if !ours.enabled || !theirs.enabled {
                    child.enabled =
                        rng.random::<f64>() >= self.config.disabled_inheritance_prob;
                }
                child
            })
            .collect();

        let nodes = self
            .nodes
            .iter()
            .map(|ours| match their_nodes.get(&ours.innovation) {
                Some(theirs) if ours.neuron_type == NeuronType::Hidden && rng.random::<bool>() => {
                    NodeGene {
                        activation: theirs.activation,
                        ..ours.clone()
                    }
                }
                _ => ours.clone(),
            })
            .collect();

        Self::from_genes(
            registry.next_genotype_id(),
            nodes,
            links,
            self.neurons_per_module,
            self.archetype,
            self.config.clone(),
        )
    }

    fn copy(&self, registry: &IdentityRegistry) -> Self {
        Self {
            id: registry.next_genotype_id(),
            ..self.clone()
        }
    }

    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self {
        Self::random(self.config.clone(), self.archetype, registry, rng)
    }

    fn phenotype(&self) -> GenotypeResult<Network> {
        Network::from_genome(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_random_genome_layout() {
        let registry = IdentityRegistry::new();
        let genome = NetworkGenome::random(NeatConfig::minimal(3, 2), 0, &registry, &mut test_rng());

        assert_eq!(genome.nodes.len(), 5);
        assert_eq!(genome.links.len(), 6);
        assert_eq!(genome.num_modules(), 1);
        assert_eq!(genome.module_usage(), &[0]);
        assert!(genome.validate().is_ok());
        for link in &genome.links {
            assert!(link.weight.abs() <= 1.0);
        }
    }

    #[test]
    fn test_random_genomes_share_innovations() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let a = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        let b = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);

        assert_ne!(a.id(), b.id());
        let ia: Vec<u64> = a.links.iter().map(|l| l.innovation).collect();
        let ib: Vec<u64> = b.links.iter().map(|l| l.innovation).collect();
        assert_eq!(ia, ib);
    }

    #[test]
    fn test_multi_module_genome() {
        let registry = IdentityRegistry::new();
        let config = NeatConfig {
            num_modules: 3,
            ..NeatConfig::minimal(2, 2)
        };
        let genome = NetworkGenome::random(config, 0, &registry, &mut test_rng());
        assert_eq!(genome.num_modules(), 3);
        assert_eq!(genome.neurons_per_module(), 2);
        assert_eq!(
            genome
                .nodes
                .iter()
                .filter(|n| n.neuron_type == NeuronType::Output)
                .count(),
            6
        );
    }

    #[test]
    fn test_from_genes_rejects_duplicates() {
        let nodes = vec![NodeGene::input(0), NodeGene::input(0)];
        let err = NetworkGenome::from_genes(0, nodes, vec![], 1, 0, NeatConfig::default());
        assert!(matches!(
            err,
            Err(GenotypeError::StructuralInvariantViolation(_))
        ));
    }

    #[test]
    fn test_from_genes_rejects_dangling_link() {
        let nodes = vec![NodeGene::input(0), NodeGene::output(1, Activation::Tanh)];
        let links = vec![LinkGene::new(0, 7, 1.0, 100)];
        let err = NetworkGenome::from_genes(0, nodes, links, 1, 0, NeatConfig::default());
        assert!(matches!(
            err,
            Err(GenotypeError::StructuralInvariantViolation(msg)) if msg.contains("missing node 7")
        ));
    }

    #[test]
    fn test_add_link() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let nodes = vec![NodeGene::input(0), NodeGene::output(1, Activation::Tanh)];
        let mut genome =
            NetworkGenome::from_genes(0, nodes, vec![], 1, 0, NeatConfig::minimal(1, 1)).unwrap();

        let innovation = genome.add_link(0, 1, &registry, &mut rng);
        assert!(innovation.is_some());
        assert_eq!(genome.links.len(), 1);

        assert!(genome.add_link(0, 1, &registry, &mut rng).is_none());
        assert!(genome.add_link(1, 0, &registry, &mut rng).is_none());
    }

    #[test]
    fn test_add_node_splits_link() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut genome = NetworkGenome::random(NeatConfig::minimal(1, 1), 0, &registry, &mut rng);
        let original = genome.links[0].clone();

        let node = genome.add_node(0, &registry, &mut rng).unwrap();

        assert_eq!(genome.nodes.len(), 3);
        assert_eq!(genome.nodes[1].innovation, node);
        assert_eq!(genome.nodes[1].neuron_type, NeuronType::Hidden);
        assert!(!genome.links[0].enabled);
        assert_eq!(genome.num_enabled_links(), 2);

        let into = &genome.links[1];
        let out = &genome.links[2];
        assert_eq!((into.source, into.target, into.weight), (0, node, 1.0));
        assert_eq!((out.source, out.target), (node, 1));
        assert_eq!(out.weight, original.weight);
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn test_add_node_after_innovation_reset_stays_unique() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut genome = NetworkGenome::random(NeatConfig::minimal(3, 2), 0, &registry, &mut rng);

        registry.set_innovation(0);
        let node = genome.add_node(0, &registry, &mut rng).unwrap();

        assert_eq!(genome.nodes.iter().filter(|n| n.innovation == node).count(), 1);
        let mut links: Vec<u64> = genome.links.iter().map(|l| l.innovation).collect();
        links.sort_unstable();
        links.dedup();
        assert_eq!(links.len(), genome.links.len());
        assert!(genome.validate().is_ok());
        assert!(genome.phenotype().is_ok());
    }

    #[test]
    fn test_same_split_in_archetype_reuses_innovation() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut a = NetworkGenome::random(NeatConfig::minimal(1, 1), 0, &registry, &mut rng);
        let mut b = NetworkGenome::random(NeatConfig::minimal(1, 1), 0, &registry, &mut rng);

        let na = a.add_node(0, &registry, &mut rng);
        let nb = b.add_node(0, &registry, &mut rng);
        assert_eq!(na, nb);
        assert_eq!(a.links[2].innovation, b.links[2].innovation);
    }

    #[test]
    fn test_mutation_never_removes_genes() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let config = NeatConfig {
            add_link_prob: 1.0,
            add_node_prob: 1.0,
            disable_link_prob: 0.3,
            ..NeatConfig::minimal(3, 2)
        };
        let mut genome = NetworkGenome::random(config, 0, &registry, &mut rng);

        for _ in 0..20 {
            let nodes_before: Vec<u64> = genome.nodes.iter().map(|n| n.innovation).collect();
            let links_before: Vec<u64> = genome.links.iter().map(|l| l.innovation).collect();
            genome.mutate(&registry, &mut rng);

            for innovation in nodes_before {
                assert!(genome.find_node(innovation).is_some());
            }
            for innovation in links_before {
                assert!(genome.find_link(innovation).is_some());
            }
            assert!(genome.validate().is_ok());
        }
    }

    #[test]
    fn test_crossover_keeps_innovations_and_designated_structure() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut a = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        let mut b = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        a.add_node(0, &registry, &mut rng);
        b.add_node(1, &registry, &mut rng);

        let child = a.crossover(&b, &registry, &mut rng).unwrap();

        assert_ne!(child.id(), a.id());
        assert_ne!(child.id(), b.id());
        let child_links: Vec<u64> = child.links.iter().map(|l| l.innovation).collect();
        let a_links: Vec<u64> = a.links.iter().map(|l| l.innovation).collect();
        assert_eq!(child_links, a_links);
        assert_eq!(child.nodes.len(), a.nodes.len());
        assert!(child.validate().is_ok());
    }

    #[test]
    fn test_blend_crossover_averages_matching_weights() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let config = NeatConfig {
            crossover_policy: CrossoverPolicy::Blend,
            ..NeatConfig::minimal(2, 1)
        };
        let a = NetworkGenome::random(config.clone(), 0, &registry, &mut rng);
        let b = NetworkGenome::random(config, 0, &registry, &mut rng);

        let child = a.crossover(&b, &registry, &mut rng).unwrap();
        for ((c, x), y) in child.links.iter().zip(&a.links).zip(&b.links) {
            assert!((c.weight - (x.weight + y.weight) / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_crossover_rejects_other_archetype() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let a = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        let b = NetworkGenome::random(NeatConfig::minimal(2, 1), 1, &registry, &mut rng);

        assert_eq!(
            a.crossover(&b, &registry, &mut rng).unwrap_err(),
            GenotypeError::ArchetypeMismatch { ours: 0, theirs: 1 }
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut original = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        original.record_module_usage(&[4]);

        let mut copy = original.copy(&registry);
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.module_usage(), &[4]);

        let before = original.links[0].weight;
        copy.links[0].weight += 1.0;
        copy.record_module_usage(&[9]);
        assert_eq!(original.links[0].weight, before);
        assert_eq!(original.module_usage(), &[4]);
    }

    #[test]
    fn test_new_instance_is_fresh() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let mut genome = NetworkGenome::random(NeatConfig::minimal(2, 1), 3, &registry, &mut rng);
        genome.record_module_usage(&[11]);

        let fresh = genome.new_instance(&registry, &mut rng);
        assert_ne!(fresh.id(), genome.id());
        assert_eq!(fresh.archetype(), 3);
        assert_eq!(fresh.module_usage(), &[0]);
        assert_eq!(fresh.nodes.len(), genome.nodes.len());
    }

    #[test]
    fn test_compatibility_distance() {
        let registry = IdentityRegistry::new();
        let mut rng = test_rng();
        let a = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        let mut b = a.copy(&registry);

        assert!(a.compatibility_distance(&a).abs() < 1e-12);
        b.add_node(0, &registry, &mut rng);
        let ab = a.compatibility_distance(&b);
        assert!(ab > 0.0);
        assert!((ab - b.compatibility_distance(&a)).abs() < 1e-12);
    }
}
