//! Substrate geometry.
//!
//! A [`SubstrateTopology`] declares named 2D grids of neurons and which grids
//! connect to which. [`SubstrateLayout::from_topology`] resolves it once into
//! an immutable, index-based layout; decoding never consults the provider
//! again.

use std::collections::HashMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{configuration, GenotypeResult};
use crate::gene::NeuronType;

/// Role of a substrate's neurons in the decoded network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubstrateType {
    Input,
    Output,
    Process,
}

impl SubstrateType {
    /// Neuron type of the node genes synthesized for this substrate.
    #[must_use]
    pub const fn neuron_type(self) -> NeuronType {
        match self {
            SubstrateType::Input => NeuronType::Input,
            SubstrateType::Output => NeuronType::Output,
            SubstrateType::Process => NeuronType::Process,
        }
    }
}

/// A named `width` x `height` grid of neurons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    pub name: String,
    pub substrate_type: SubstrateType,
    pub width: usize,
    pub height: usize,
    /// Placement for visualization; ignored when decoding.
    pub position: (i32, i32, i32),
}

impl Substrate {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        substrate_type: SubstrateType,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            name: name.into(),
            substrate_type,
            width,
            height,
            position: (0, 0, 0),
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: (i32, i32, i32)) -> Self {
        self.position = position;
        self
    }

    /// Number of neurons.
    #[must_use]
    pub const fn cells(&self) -> usize {
        self.width * self.height
    }
}

/// Provider of substrate declarations.
///
/// Connectivity order matters: the pair at position `k` is weighted by output
/// `k` of the pattern-producing network.
pub trait SubstrateTopology {
    fn substrates(&self) -> Vec<Substrate>;

    /// `(source name, target name)` pairs.
    fn connectivity(&self) -> Vec<(String, String)>;
}

/// A topology given as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTopology {
    pub substrates: Vec<Substrate>,
    pub connectivity: Vec<(String, String)>,
}

impl StaticTopology {
    #[must_use]
    pub fn new<S: Into<String>>(substrates: Vec<Substrate>, connectivity: Vec<(S, S)>) -> Self {
        Self {
            substrates,
            connectivity: connectivity
                .into_iter()
                .map(|(source, target)| (source.into(), target.into()))
                .collect(),
        }
    }
}

impl SubstrateTopology for StaticTopology {
    fn substrates(&self) -> Vec<Substrate> {
        self.substrates.clone()
    }

    fn connectivity(&self) -> Vec<(String, String)> {
        self.connectivity.clone()
    }
}

/// Maps a cell index to the coordinates fed to the pattern-producing network.
pub trait CoordinateMapping: Debug + Send + Sync {
    fn transform(&self, x: usize, y: usize, width: usize, height: usize) -> (f64, f64);
}

/// Spreads each axis evenly over `[-1, 1]`; a single cell sits at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CenteredMapping;

impl CoordinateMapping for CenteredMapping {
    fn transform(&self, x: usize, y: usize, width: usize, height: usize) -> (f64, f64) {
        (centered(x, width), centered(y, height))
    }
}

#[inline]
fn centered(index: usize, extent: usize) -> f64 {
    if extent > 1 {
        (index as f64 / (extent - 1) as f64) * 2.0 - 1.0
    } else {
        0.0
    }
}

/// A validated, index-resolved topology.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstrateLayout {
    substrates: Vec<Substrate>,
    /// Address of each substrate's first cell.
    offsets: Vec<usize>,
    connections: Vec<(usize, usize)>,
    node_count: usize,
    output_count: usize,
}

impl SubstrateLayout {
    /// Read a provider once and resolve connectivity names to indices.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::Configuration`](crate::error::GenotypeError::Configuration)
    /// for duplicate or unknown substrate names, or a topology with no output
    /// cells.
    pub fn from_topology(topology: &dyn SubstrateTopology) -> GenotypeResult<Self> {
        Self::new(topology.substrates(), topology.connectivity())
    }

    /// # Errors
    ///
    /// See [`from_topology`](Self::from_topology).
    pub fn new(
        substrates: Vec<Substrate>,
        connectivity: Vec<(String, String)>,
    ) -> GenotypeResult<Self> {
        let mut index = HashMap::with_capacity(substrates.len());
        let mut offsets = Vec::with_capacity(substrates.len());
        let mut node_count = 0;
        let mut output_count = 0;

        for (i, substrate) in substrates.iter().enumerate() {
            if index.insert(substrate.name.as_str(), i).is_some() {
                return Err(configuration(format!(
                    "duplicate substrate name '{}'",
                    substrate.name
                )));
            }
            offsets.push(node_count);
            node_count += substrate.cells();
            if substrate.substrate_type == SubstrateType::Output {
                output_count += substrate.cells();
            }
        }

        if output_count == 0 {
            return Err(configuration("topology has no output cells".to_string()));
        }

        let resolve = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| configuration(format!("unknown substrate '{name}' in connectivity")))
        };
        let connections = connectivity
            .iter()
            .map(|(source, target)| Ok((resolve(source)?, resolve(target)?)))
            .collect::<GenotypeResult<Vec<_>>>()?;

        Ok(Self {
            substrates,
            offsets,
            connections,
            node_count,
            output_count,
        })
    }

    /// Node id of cell `(x, y)` in substrate `k`.
    #[inline]
    #[must_use]
    pub fn address(&self, k: usize, x: usize, y: usize) -> usize {
        self.offsets[k] + self.substrates[k].width * y + x
    }

    /// Total number of cells over all substrates.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Total number of cells over output substrates.
    #[must_use]
    pub const fn output_count(&self) -> usize {
        self.output_count
    }

    #[must_use]
    pub fn substrates(&self) -> &[Substrate] {
        &self.substrates
    }

    /// Resolved `(source index, target index)` pairs, in declaration order.
    #[must_use]
    pub fn connections(&self) -> &[(usize, usize)] {
        &self.connections
    }
}
