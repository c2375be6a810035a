//! Network phenotypes.
//!
//! [`Network::from_genome`] is the direct decode: one neuron per enabled node
//! gene and one synapse per enabled link gene between enabled nodes. Neurons
//! live in a `SlotMap` arena; evaluation runs over dense indices through a
//! CSR [`EvaluationPlan`](crate::topology::EvaluationPlan).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::activation::Activation;
use crate::error::{GenotypeError, GenotypeResult};
use crate::gene::NeuronType;
use crate::genome::NetworkGenome;
use crate::topology::{Edge, EvaluationPlan};

new_key_type! {
    /// Handle of a neuron within one [`Network`].
    pub struct NeuronId;
}

/// A decoded neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    /// Innovation of the node gene this neuron came from.
    pub innovation: u64,
    pub neuron_type: NeuronType,
    pub activation: Activation,
}

/// A decoded, weighted connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    pub source: NeuronId,
    pub target: NeuronId,
    pub weight: f64,
    /// Innovation of the link gene this synapse came from.
    pub innovation: u64,
}

/// An evaluable network built from a [`NetworkGenome`].
///
/// Activations persist between calls to [`process`](Self::process). In an
/// acyclic network this has no observable effect; neurons on cycles see the
/// previous step's value of predecessors not yet updated. Call
/// [`flush`](Self::flush) to reset that state.
#[derive(Debug, Clone)]
pub struct Network {
    neurons: SlotMap<NeuronId, Neuron>,
    synapses: Vec<Synapse>,
    input_ids: Vec<NeuronId>,
    output_ids: Vec<NeuronId>,
    dense: SecondaryMap<NeuronId, usize>,
    plan: EvaluationPlan,
    activations: Vec<f64>,
    activation_fns: Vec<Activation>,
    input_indices: Vec<usize>,
    output_indices: Vec<usize>,
    neurons_per_module: usize,
    module_usage: Vec<u32>,
}

impl Network {
    /// Decode a genome.
    ///
    /// Input and output neurons are reported in gene order. Disabled genes,
    /// and links touching a disabled node, are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::StructuralInvariantViolation`] if an enabled
    /// link names a node innovation that is not in the genome, or if two node
    /// genes share an innovation.
    pub fn from_genome(genome: &NetworkGenome) -> GenotypeResult<Self> {
        let mut neurons: SlotMap<NeuronId, Neuron> = SlotMap::with_capacity_and_key(genome.nodes.len());
        let mut dense = SecondaryMap::new();
        let mut by_innovation: HashMap<u64, Option<NeuronId>> = HashMap::with_capacity(genome.nodes.len());
        let mut activation_fns = Vec::with_capacity(genome.nodes.len());
        let mut input_ids = Vec::new();
        let mut output_ids = Vec::new();

        for node in &genome.nodes {
            let id = node.enabled.then(|| {
                neurons.insert(Neuron {
                    innovation: node.innovation,
                    neuron_type: node.neuron_type,
                    activation: node.activation,
                })
            });
            if by_innovation.insert(node.innovation, id).is_some() {
                return Err(GenotypeError::StructuralInvariantViolation(format!(
                    "duplicate node innovation {}",
                    node.innovation
                )));
            }
            let Some(id) = id else { continue };
            dense.insert(id, activation_fns.len());
            activation_fns.push(node.activation);
            match node.neuron_type {
                NeuronType::Input => input_ids.push(id),
                NeuronType::Output => output_ids.push(id),
                NeuronType::Hidden | NeuronType::Process => {}
            }
        }

        let mut synapses = Vec::with_capacity(genome.links.len());
        for link in genome.links.iter().filter(|l| l.enabled) {
            let resolve = |innovation: u64| {
                by_innovation.get(&innovation).copied().ok_or_else(|| {
                    GenotypeError::StructuralInvariantViolation(format!(
                        "link {} references missing node {}",
                        link.innovation, innovation
                    ))
                })
            };
            if let (Some(source), Some(target)) = (resolve(link.source)?, resolve(link.target)?) {
                synapses.push(Synapse {
                    source,
                    target,
                    weight: link.weight,
                    innovation: link.innovation,
                });
            }
        }

        let node_count = neurons.len();
        let mut is_input = vec![false; node_count];
        let input_indices: Vec<usize> = input_ids.iter().map(|&id| dense[id]).collect();
        for &idx in &input_indices {
            is_input[idx] = true;
        }
        let output_indices: Vec<usize> = output_ids.iter().map(|&id| dense[id]).collect();

        let edges = synapses
            .iter()
            .map(|s| Edge {
                source: dense[s.source],
                target: dense[s.target],
                weight: s.weight,
                innovation: s.innovation,
            })
            .collect();
        let plan = EvaluationPlan::build(node_count, edges, &is_input);

        let neurons_per_module = genome.neurons_per_module();
        let num_modules = output_ids
            .len()
            .checked_div(neurons_per_module)
            .unwrap_or(0);

        Ok(Self {
            neurons,
            synapses,
            input_ids,
            output_ids,
            dense,
            plan,
            activations: vec![0.0; node_count],
            activation_fns,
            input_indices,
            output_indices,
            neurons_per_module,
            module_usage: vec![0; num_modules],
        })
    }

    /// Evaluate one step, writing the selected module's outputs into `outputs`.
    ///
    /// With a single module every output neuron is written. With several, the
    /// module holding the largest single output wins and its usage count is
    /// incremented.
    ///
    /// # Panics
    ///
    /// Panics if `inputs.len() != self.num_inputs()` or
    /// `outputs.len() != self.num_outputs()`.
    pub fn process_into(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        assert_eq!(
            inputs.len(),
            self.input_indices.len(),
            "Input length mismatch: expected {}, got {}",
            self.input_indices.len(),
            inputs.len()
        );
        assert_eq!(
            outputs.len(),
            self.num_outputs(),
            "Output length mismatch: expected {}, got {}",
            self.num_outputs(),
            outputs.len()
        );

        for (&idx, &value) in self.input_indices.iter().zip(inputs) {
            self.activations[idx] = value;
        }

        for &idx in self.plan.order() {
            let sum: f64 = self
                .plan
                .incoming(idx)
                .map(|(src, weight)| self.activations[src] * weight)
                .sum();
            self.activations[idx] = self.activation_fns[idx].apply(sum);
        }

        if self.module_usage.is_empty() {
            return;
        }
        let winner = self.select_module();
        self.module_usage[winner] += 1;
        let start = winner * self.neurons_per_module;
        for (out, &idx) in outputs
            .iter_mut()
            .zip(&self.output_indices[start..start + self.neurons_per_module])
        {
            *out = self.activations[idx];
        }
    }

    /// Evaluate one step and return the selected module's outputs.
    ///
    /// # Panics
    ///
    /// Panics if `inputs.len() != self.num_inputs()`.
    pub fn process(&mut self, inputs: &[f64]) -> Vec<f64> {
        let mut outputs = vec![0.0; self.num_outputs()];
        self.process_into(inputs, &mut outputs);
        outputs
    }

    /// Reset all activations to zero.
    pub fn flush(&mut self) {
        self.activations.fill(0.0);
    }

    fn select_module(&self) -> usize {
        if self.module_usage.len() == 1 {
            return 0;
        }
        let mut best = (0, f64::NEG_INFINITY);
        for module in 0..self.module_usage.len() {
            let start = module * self.neurons_per_module;
            let peak = self.output_indices[start..start + self.neurons_per_module]
                .iter()
                .map(|&idx| self.activations[idx])
                .fold(f64::NEG_INFINITY, f64::max);
            if peak > best.1 {
                best = (module, peak);
            }
        }
        best.0
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_indices.len()
    }

    /// Number of values produced per call: one module's worth.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        if self.module_usage.len() > 1 {
            self.neurons_per_module
        } else {
            self.output_indices.len()
        }
    }

    #[must_use]
    pub fn num_modules(&self) -> usize {
        self.module_usage.len()
    }

    /// How often each module was selected since decoding.
    #[must_use]
    pub fn module_usage(&self) -> &[u32] {
        &self.module_usage
    }

    /// Whether the synapses contain a cycle.
    #[must_use]
    pub fn is_recurrent(&self) -> bool {
        self.plan.is_recurrent()
    }

    #[must_use]
    pub fn neurons(&self) -> &SlotMap<NeuronId, Neuron> {
        &self.neurons
    }

    #[must_use]
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    #[must_use]
    pub fn input_ids(&self) -> &[NeuronId] {
        &self.input_ids
    }

    #[must_use]
    pub fn output_ids(&self) -> &[NeuronId] {
        &self.output_ids
    }

    /// Most recent activation of a neuron.
    #[must_use]
    pub fn activation(&self, id: NeuronId) -> Option<f64> {
        self.dense.get(id).map(|&idx| self.activations[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{LinkGene, NodeGene};
    use crate::genome::NeatConfig;
    use crate::genotype::Genotype;
    use crate::registry::IdentityRegistry;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn genome(nodes: Vec<NodeGene>, links: Vec<LinkGene>, per_module: usize) -> NetworkGenome {
        NetworkGenome::from_genes(0, nodes, links, per_module, 0, NeatConfig::default()).unwrap()
    }

    #[test]
    fn test_one_neuron_per_enabled_gene() {
        let mut hidden = NodeGene::hidden(2, Activation::Identity);
        hidden.enabled = false;
        let mut disabled = LinkGene::new(0, 1, 5.0, 11);
        disabled.enabled = false;
        let g = genome(
            vec![
                NodeGene::input(0),
                hidden,
                NodeGene::output(1, Activation::Identity),
            ],
            vec![
                LinkGene::new(0, 1, 0.5, 10),
                disabled,
                LinkGene::new(0, 2, 1.0, 12),
                LinkGene::new(2, 1, 1.0, 13),
            ],
            1,
        );

        let mut network = Network::from_genome(&g).unwrap();
        assert_eq!(network.neurons().len(), 2);
        assert_eq!(network.synapses().len(), 1);
        assert_eq!(network.num_inputs(), 1);
        assert_eq!(network.num_outputs(), 1);
        assert_eq!(network.process(&[2.0]), vec![1.0]);
    }

    #[test]
    fn test_dangling_link_fails_loudly() {
        let mut g = genome(
            vec![NodeGene::input(0), NodeGene::output(1, Activation::Identity)],
            vec![],
            1,
        );
        g.links.push(LinkGene::new(0, 99, 1.0, 5));

        assert!(matches!(
            Network::from_genome(&g),
            Err(GenotypeError::StructuralInvariantViolation(_))
        ));
    }

    #[test]
    fn test_hidden_layer_evaluation() {
        let g = genome(
            vec![
                NodeGene::input(0),
                NodeGene::input(1),
                NodeGene::hidden(5, Activation::ReLU),
                NodeGene::output(2, Activation::Identity),
            ],
            vec![
                LinkGene::new(0, 5, 1.0, 10),
                LinkGene::new(1, 5, -1.0, 11),
                LinkGene::new(5, 2, 2.0, 12),
            ],
            1,
        );
        let mut network = Network::from_genome(&g).unwrap();

        assert_eq!(network.process(&[3.0, 1.0]), vec![4.0]);
        assert_eq!(network.process(&[1.0, 3.0]), vec![0.0]);
        assert!(!network.is_recurrent());
    }

    #[test]
    fn test_module_selection_counts_usage() {
        let g = genome(
            vec![
                NodeGene::input(0),
                NodeGene::output(1, Activation::Identity),
                NodeGene::output(2, Activation::Identity),
            ],
            vec![LinkGene::new(0, 1, 1.0, 10), LinkGene::new(0, 2, -1.0, 11)],
            1,
        );
        let mut network = Network::from_genome(&g).unwrap();
        assert_eq!(network.num_modules(), 2);
        assert_eq!(network.num_outputs(), 1);

        assert_eq!(network.process(&[0.5]), vec![0.5]);
        assert_eq!(network.process(&[-0.5]), vec![0.5]);
        assert_eq!(network.process(&[-0.25]), vec![0.25]);
        assert_eq!(network.module_usage(), &[1, 2]);
    }

    #[test]
    fn test_recurrent_network_keeps_state_until_flush() {
        // 0 -> 1 (output), 1 -> 3 (hidden), 3 -> 1 closes a cycle
        let g = genome(
            vec![
                NodeGene::input(0),
                NodeGene::hidden(3, Activation::Identity),
                NodeGene::output(1, Activation::Identity),
            ],
            vec![
                LinkGene::new(0, 1, 1.0, 10),
                LinkGene::new(1, 3, 1.0, 11),
                LinkGene::new(3, 1, 1.0, 12),
            ],
            1,
        );
        let mut network = Network::from_genome(&g).unwrap();
        assert!(network.is_recurrent());

        let first = network.process(&[1.0]);
        let second = network.process(&[1.0]);
        assert!(second[0] > first[0]);

        network.flush();
        assert_eq!(network.process(&[1.0]), first);
    }

    #[test]
    #[should_panic(expected = "Input length mismatch")]
    fn test_input_length_mismatch_panics() {
        let registry = IdentityRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let g = NetworkGenome::random(NeatConfig::minimal(2, 1), 0, &registry, &mut rng);
        let mut network = g.phenotype().unwrap();
        network.process(&[1.0]);
    }
}
