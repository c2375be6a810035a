//! # Symbios HyperNEAT
//!
//! Genetic encodings for evolving neural-network controllers, and the decoders
//! that turn them into evaluable networks.
//!
//! ## Features
//!
//! - **Direct Encoding**: NEAT genomes with innovation-aligned crossover and
//!   structural mutation (add link, split link)
//! - **Indirect Encoding**: HyperNEAT decoding of a CPPN over declared 2D
//!   substrates into a much larger target network
//! - **Composition**: `CombinedGenotype` evolves two encodings as one individual
//! - **Explicit Identity**: genotype ids and innovation numbers come from an
//!   injected `IdentityRegistry`, never from global state
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use symbios_hyperneat::{
//!     CppnGenotype, Genotype, HyperNeatConfig, IdentityRegistry, StaticTopology, Substrate,
//!     SubstrateDecoder, SubstrateType,
//! };
//!
//! // A 3x3 sensor grid wired to two motor neurons
//! let topology = StaticTopology::new(
//!     vec![
//!         Substrate::new("retina", SubstrateType::Input, 3, 3),
//!         Substrate::new("motor", SubstrateType::Output, 2, 1),
//!     ],
//!     vec![("retina", "motor")],
//! );
//! let config = HyperNeatConfig::for_topology(&topology);
//! let decoder = Arc::new(SubstrateDecoder::centered(&topology, config)?);
//!
//! let registry = IdentityRegistry::new();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut genotype = CppnGenotype::random(decoder, 0, &registry, &mut rng);
//! genotype.mutate(&registry, &mut rng);
//!
//! let mut network = genotype.phenotype()?;
//! let outputs = network.process(&[0.0; 9]);
//! assert_eq!(outputs.len(), 2);
//! # Ok::<(), symbios_hyperneat::GenotypeError>(())
//! ```
//!
//! ## Architecture
//!
//! ### Innovation Numbers
//!
//! Link and node genes carry innovation numbers handed out by the
//! `IdentityRegistry`. The registry remembers structural mutations per
//! archetype, so two genomes of one lineage that add the same link get the
//! same number and line up during crossover.
//!
//! ### Substrate Decoding
//!
//! A `SubstrateDecoder` resolves the topology once. Each decode numbers the
//! substrate cells from 0, queries the CPPN with `[sx, sy, tx, ty, 1.0]` for
//! every cell pair of every connection, and keeps the links whose output
//! magnitude exceeds the expression threshold.
//!
//! ### Networks
//!
//! Neurons live in a `SlotMap` arena. Evaluation runs over a CSR snapshot of
//! the synapses in topological order; recurrent neurons read the previous
//! step's activations.

pub mod activation;
pub mod combined;
pub mod error;
pub mod gene;
pub mod genome;
pub mod genotype;
pub mod hyperneat;
pub mod network;
pub mod real;
pub mod registry;
pub mod substrate;
mod topology;

// Re-exports for convenience
pub use activation::Activation;
pub use combined::CombinedGenotype;
pub use error::{GenotypeError, GenotypeResult};
pub use gene::{LinkGene, NeuronType, NodeGene};
pub use genome::{CrossoverPolicy, NeatConfig, NetworkGenome};
pub use genotype::{Genotype, GenotypeKind, NetworkGenotype};
pub use hyperneat::{
    express_link, CppnGenotype, HyperNeatConfig, SubstrateDecoder, BIAS, CPPN_INPUTS,
    DECODED_ARCHETYPE,
};
pub use network::{Network, Neuron, NeuronId, Synapse};
pub use real::{RealValuedConfig, RealValuedGenotype};
pub use registry::{IdentityRegistry, RESERVED_INNOVATIONS};
pub use substrate::{
    CenteredMapping, CoordinateMapping, StaticTopology, Substrate, SubstrateLayout,
    SubstrateTopology, SubstrateType,
};
