//! Gene records.
//!
//! Genes are plain values: a genome owns `Vec`s of them, so cloning a genome
//! is a structural deep copy. Links refer to nodes by innovation number, never
//! by position, which keeps them valid across copies and crossovers.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// Role of a neuron in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronType {
    /// Receives an external value; no activation applied.
    Input,
    /// Internal node added by structural mutation.
    Hidden,
    /// Produces a network output.
    Output,
    /// Internal node synthesized from a processing substrate.
    Process,
}

/// A neuron gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub innovation: u64,
    pub activation: Activation,
    pub neuron_type: NeuronType,
    /// Disabled nodes produce no neuron when decoded.
    pub enabled: bool,
}

impl NodeGene {
    #[must_use]
    pub fn new(innovation: u64, neuron_type: NeuronType, activation: Activation) -> Self {
        Self {
            innovation,
            activation,
            neuron_type,
            enabled: true,
        }
    }

    /// Input node; inputs pass their value through unchanged.
    #[must_use]
    pub fn input(innovation: u64) -> Self {
        Self::new(innovation, NeuronType::Input, Activation::Identity)
    }

    #[must_use]
    pub fn output(innovation: u64, activation: Activation) -> Self {
        Self::new(innovation, NeuronType::Output, activation)
    }

    #[must_use]
    pub fn hidden(innovation: u64, activation: Activation) -> Self {
        Self::new(innovation, NeuronType::Hidden, activation)
    }
}

/// A weighted, directed link between two node genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkGene {
    /// Innovation of the source node.
    pub source: u64,
    /// Innovation of the target node.
    pub target: u64,
    pub weight: f64,
    pub innovation: u64,
    /// Disabled links are skipped when decoding but kept for crossover.
    pub enabled: bool,
}

impl LinkGene {
    /// Create an enabled link.
    #[must_use]
    pub fn new(source: u64, target: u64, weight: f64, innovation: u64) -> Self {
        Self {
            source,
            target,
            weight,
            innovation,
            enabled: true,
        }
    }
}
