//! HyperNEAT decoding.
//!
//! A [`CppnGenotype`] evolves a small compositional pattern-producing network.
//! Its phenotype is not the CPPN itself: a [`SubstrateDecoder`] queries the
//! CPPN once per pair of cells across each connected pair of substrates and
//! assembles the much larger target network from the answers.
//!
//! For connection `k`, the CPPN receives `[sx, sy, tx, ty, 1.0]` (normalized
//! source and target cell coordinates plus bias) and output `k` decides the
//! link. A link is expressed only when that output's magnitude exceeds the
//! threshold, and its weight is the output pulled toward zero by the
//! threshold, so weights grow continuously from 0 at the expression boundary.
//!
//! Node genes are numbered 0, 1, 2, ... per decode, substrate by substrate;
//! link genes continue the same counter. Links name their endpoints by cell
//! address (substrate offset plus row-major index), so node `i` is the cell
//! at address `i`. The decoded genome is rebuilt on every call and never
//! stored.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::Activation;
use crate::error::{configuration, GenotypeResult};
use crate::gene::{LinkGene, NeuronType, NodeGene};
use crate::genome::{NeatConfig, NetworkGenome};
use crate::genotype::{Genotype, GenotypeKind};
use crate::network::Network;
use crate::registry::IdentityRegistry;
use crate::substrate::{CenteredMapping, CoordinateMapping, SubstrateLayout, SubstrateTopology};

/// CPPN inputs: source x, source y, target x, target y, bias.
pub const CPPN_INPUTS: usize = 5;

/// Constant fed to the last CPPN input.
pub const BIAS: f64 = 1.0;

/// Archetype of decoded target genomes; they never take part in crossover.
pub const DECODED_ARCHETYPE: i32 = -1;

/// Configuration of substrate decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperNeatConfig {
    /// Links are expressed only where `|cppn output| > threshold`. Must be
    /// finite and positive.
    pub link_expression_threshold: f64,
    /// Activation of every synthesized substrate neuron.
    pub substrate_activation: Activation,
    /// Shape and mutation settings of the CPPN genomes.
    pub cppn_config: NeatConfig,
}

impl Default for HyperNeatConfig {
    fn default() -> Self {
        Self {
            link_expression_threshold: 0.2,
            substrate_activation: Activation::Tanh,
            cppn_config: NeatConfig::cppn(CPPN_INPUTS, 1),
        }
    }
}

impl HyperNeatConfig {
    /// Default settings with one CPPN output per connection of `topology`.
    #[must_use]
    pub fn for_topology(topology: &dyn SubstrateTopology) -> Self {
        let outputs = topology.connectivity().len().max(1);
        Self {
            cppn_config: NeatConfig::cppn(CPPN_INPUTS, outputs),
            ..Default::default()
        }
    }
}

/// Apply the link expression rule to one CPPN output.
///
/// Returns the link weight, or `None` if the link is not expressed.
#[inline]
#[must_use]
pub fn express_link(output: f64, threshold: f64) -> Option<f64> {
    if output > threshold {
        Some(output - threshold)
    } else if output < -threshold {
        Some(output + threshold)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    address: u64,
    x: f64,
    y: f64,
}

/// Immutable decoding context shared by every [`CppnGenotype`] of a run.
#[derive(Debug)]
pub struct SubstrateDecoder {
    layout: SubstrateLayout,
    config: HyperNeatConfig,
    mapping: Box<dyn CoordinateMapping>,
    /// Per substrate, cells in synthesis order (x outer, y inner).
    cells: Vec<Vec<Cell>>,
}

impl SubstrateDecoder {
    /// Resolve `topology` once and precompute every cell's coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::Configuration`](crate::error::GenotypeError::Configuration)
    /// if the topology is invalid, the threshold is not a positive finite
    /// number, or `config.cppn_config` cannot drive every connection.
    pub fn new(
        topology: &dyn SubstrateTopology,
        config: HyperNeatConfig,
        mapping: Box<dyn CoordinateMapping>,
    ) -> GenotypeResult<Self> {
        let threshold = config.link_expression_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(configuration(format!(
                "link expression threshold must be positive, got {threshold}"
            )));
        }

        let layout = SubstrateLayout::from_topology(topology)?;
        let cppn = &config.cppn_config;
        check_cppn_arity(
            &layout,
            cppn.num_inputs,
            cppn.num_outputs * cppn.num_modules,
            cppn.num_modules,
        )?;

        let cells = layout
            .substrates()
            .iter()
            .enumerate()
            .map(|(k, s)| {
                let mut cells = Vec::with_capacity(s.cells());
                for x in 0..s.width {
                    for y in 0..s.height {
                        let (cx, cy) = mapping.transform(x, y, s.width, s.height);
                        cells.push(Cell {
                            address: layout.address(k, x, y) as u64,
                            x: cx,
                            y: cy,
                        });
                    }
                }
                cells
            })
            .collect();

        debug!(
            "substrate decoder ready: {} substrates, {} connections, {} neurons",
            layout.substrates().len(),
            layout.connections().len(),
            layout.node_count()
        );

        Ok(Self {
            layout,
            config,
            mapping,
            cells,
        })
    }

    /// Decoder with the [`CenteredMapping`].
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn centered(
        topology: &dyn SubstrateTopology,
        config: HyperNeatConfig,
    ) -> GenotypeResult<Self> {
        Self::new(topology, config, Box::new(CenteredMapping))
    }

    #[must_use]
    pub fn layout(&self) -> &SubstrateLayout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &HyperNeatConfig {
        &self.config
    }

    #[must_use]
    pub fn mapping(&self) -> &dyn CoordinateMapping {
        self.mapping.as_ref()
    }

    /// Build the target genome encoded by `cppn`.
    ///
    /// The result carries `cppn`'s id and [`DECODED_ARCHETYPE`]; `cppn` is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::Configuration`](crate::error::GenotypeError::Configuration)
    /// if the decoded CPPN does not have [`CPPN_INPUTS`] inputs, a single
    /// output module, and an output for every connection. Structural errors in the CPPN genes propagate.
    pub fn synthesize(&self, cppn: &NetworkGenome) -> GenotypeResult<NetworkGenome> {
        let mut network = Network::from_genome(cppn)?;
        check_cppn_arity(
            &self.layout,
            network.num_inputs(),
            network.num_outputs(),
            network.num_modules(),
        )?;

        let activation = self.config.substrate_activation;
        let mut next_innovation = 0u64;
        let mut nodes = Vec::with_capacity(self.layout.node_count());
        for substrate in self.layout.substrates() {
            let neuron_type = substrate.substrate_type.neuron_type();
            for _ in 0..substrate.cells() {
                nodes.push(NodeGene::new(next_innovation, neuron_type, activation));
                next_innovation += 1;
            }
        }

        let threshold = self.config.link_expression_threshold;
        let mut inputs = [0.0; CPPN_INPUTS];
        inputs[CPPN_INPUTS - 1] = BIAS;
        let mut outputs = vec![0.0; network.num_outputs()];
        let mut links = Vec::new();

        for (k, &(source, target)) in self.layout.connections().iter().enumerate() {
            for from in &self.cells[source] {
                inputs[0] = from.x;
                inputs[1] = from.y;
                for to in &self.cells[target] {
                    inputs[2] = to.x;
                    inputs[3] = to.y;
                    network.process_into(&inputs, &mut outputs);
                    if let Some(weight) = express_link(outputs[k], threshold) {
                        links.push(LinkGene::new(from.address, to.address, weight, next_innovation));
                        next_innovation += 1;
                    }
                }
            }
        }

        debug!(
            "synthesized substrate network for genotype {}: {} nodes, {} links",
            cppn.id(),
            nodes.len(),
            links.len()
        );

        let num_inputs = nodes
            .iter()
            .filter(|n| n.neuron_type == NeuronType::Input)
            .count();
        let output_count = self.layout.output_count();
        let target_config = NeatConfig {
            num_inputs,
            num_outputs: output_count,
            num_modules: 1,
            output_activation: activation,
            hidden_activations: vec![activation],
            ..NeatConfig::default()
        };
        NetworkGenome::from_genes(
            cppn.id(),
            nodes,
            links,
            output_count,
            DECODED_ARCHETYPE,
            target_config,
        )
    }

    /// Synthesize the target genome and decode it.
    ///
    /// # Errors
    ///
    /// See [`synthesize`](Self::synthesize).
    pub fn decode(&self, cppn: &NetworkGenome) -> GenotypeResult<Network> {
        self.synthesize(cppn)?.phenotype()
    }
}

fn check_cppn_arity(
    layout: &SubstrateLayout,
    inputs: usize,
    outputs: usize,
    modules: usize,
) -> GenotypeResult<()> {
    if inputs != CPPN_INPUTS {
        return Err(configuration(format!(
            "CPPN needs {CPPN_INPUTS} inputs, has {inputs}"
        )));
    }
    if modules > 1 {
        return Err(configuration(format!(
            "CPPN must have a single output module, has {modules}"
        )));
    }
    let required = layout.connections().len();
    if outputs < required {
        return Err(configuration(format!(
            "CPPN has {outputs} outputs but the topology declares {required} connections"
        )));
    }
    Ok(())
}

/// A CPPN genome paired with the decoder that interprets it.
///
/// Evolution operates on the CPPN genes only; the decoder is shared.
#[derive(Debug, Clone)]
pub struct CppnGenotype {
    cppn: NetworkGenome,
    decoder: Arc<SubstrateDecoder>,
}

impl CppnGenotype {
    /// Random CPPN shaped by the decoder's `cppn_config`.
    #[must_use]
    pub fn random<R: Rng>(
        decoder: Arc<SubstrateDecoder>,
        archetype: i32,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> Self {
        let cppn = NetworkGenome::random(decoder.config.cppn_config.clone(), archetype, registry, rng);
        Self { cppn, decoder }
    }

    /// Wrap existing CPPN genes. Arity is checked when decoding.
    #[must_use]
    pub fn from_genome(cppn: NetworkGenome, decoder: Arc<SubstrateDecoder>) -> Self {
        Self { cppn, decoder }
    }

    #[must_use]
    pub fn cppn(&self) -> &NetworkGenome {
        &self.cppn
    }

    pub fn cppn_mut(&mut self) -> &mut NetworkGenome {
        &mut self.cppn
    }

    #[must_use]
    pub fn decoder(&self) -> &Arc<SubstrateDecoder> {
        &self.decoder
    }

    /// The target genome this CPPN currently encodes.
    ///
    /// # Errors
    ///
    /// See [`SubstrateDecoder::synthesize`].
    pub fn synthesize(&self) -> GenotypeResult<NetworkGenome> {
        self.decoder.synthesize(&self.cppn)
    }
}

impl Genotype for CppnGenotype {
    type Phenotype = Network;

    fn id(&self) -> u64 {
        self.cppn.id()
    }

    fn kind(&self) -> GenotypeKind {
        GenotypeKind::Cppn
    }

    fn mutate<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        self.cppn.mutate(registry, rng);
    }

    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self> {
        if !Arc::ptr_eq(&self.decoder, &other.decoder) && self.decoder.layout != other.decoder.layout {
            return Err(configuration(
                "cannot cross CPPNs decoded over different substrate layouts".to_string(),
            ));
        }
        let cppn = self.cppn.crossover(&other.cppn, registry, rng)?;
        Ok(Self {
            cppn,
            decoder: Arc::clone(&self.decoder),
        })
    }

    fn copy(&self, registry: &IdentityRegistry) -> Self {
        Self {
            cppn: self.cppn.copy(registry),
            decoder: Arc::clone(&self.decoder),
        }
    }

    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self {
        Self::random(Arc::clone(&self.decoder), self.cppn.archetype(), registry, rng)
    }

    fn phenotype(&self) -> GenotypeResult<Network> {
        self.decoder.decode(&self.cppn)
    }
}
