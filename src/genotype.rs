//! The genotype capability contract.
//!
//! Every encoding implements [`Genotype`]. Identity and randomness are passed
//! in explicitly: operators that create a genotype draw its id from the
//! supplied [`IdentityRegistry`].
//!
//! Heterogeneous populations of network encodings use [`NetworkGenotype`],
//! whose crossover compares [`GenotypeKind`] tags before touching either
//! variant.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GenotypeError, GenotypeResult};
use crate::genome::NetworkGenome;
use crate::hyperneat::CppnGenotype;
use crate::network::Network;
use crate::registry::IdentityRegistry;

/// Discriminant of a genotype encoding, compared before crossover.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenotypeKind {
    /// Gene list decoded one-to-one.
    Direct,
    /// Pattern-producing network decoded over substrates.
    Cppn,
    RealValued,
    Combined(Box<GenotypeKind>, Box<GenotypeKind>),
}

impl fmt::Display for GenotypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenotypeKind::Direct => f.write_str("direct"),
            GenotypeKind::Cppn => f.write_str("cppn"),
            GenotypeKind::RealValued => f.write_str("real-valued"),
            GenotypeKind::Combined(first, second) => write!(f, "combined({first}, {second})"),
        }
    }
}

/// An evolvable encoding.
pub trait Genotype: Sized {
    /// What the genotype decodes to.
    type Phenotype;

    /// Unique id, assigned once at creation.
    fn id(&self) -> u64;

    fn kind(&self) -> GenotypeKind;

    /// Mutate in place. New structural genes draw innovations from `registry`.
    fn mutate<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R);

    /// Produce a child with `self` as the designated parent.
    ///
    /// # Errors
    ///
    /// Fails without modifying either operand when the encodings or lineages
    /// are incompatible, or when the child would violate a structural
    /// invariant.
    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self>;

    /// Deep copy with a fresh id.
    fn copy(&self, registry: &IdentityRegistry) -> Self;

    /// A fresh random genotype of the same shape, with a fresh id.
    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self;

    /// Decode.
    ///
    /// # Errors
    ///
    /// Fails if the genes cannot be decoded into a valid phenotype.
    fn phenotype(&self) -> GenotypeResult<Self::Phenotype>;
}

/// A network encoding, either direct or CPPN-based.
#[derive(Debug, Clone)]
pub enum NetworkGenotype {
    Direct(NetworkGenome),
    Cppn(CppnGenotype),
}

impl From<NetworkGenome> for NetworkGenotype {
    fn from(genome: NetworkGenome) -> Self {
        NetworkGenotype::Direct(genome)
    }
}

impl From<CppnGenotype> for NetworkGenotype {
    fn from(genotype: CppnGenotype) -> Self {
        NetworkGenotype::Cppn(genotype)
    }
}

impl Genotype for NetworkGenotype {
    type Phenotype = Network;

    fn id(&self) -> u64 {
        match self {
            NetworkGenotype::Direct(g) => g.id(),
            NetworkGenotype::Cppn(g) => g.id(),
        }
    }

    fn kind(&self) -> GenotypeKind {
        match self {
            NetworkGenotype::Direct(g) => g.kind(),
            NetworkGenotype::Cppn(g) => g.kind(),
        }
    }

    fn mutate<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        match self {
            NetworkGenotype::Direct(g) => g.mutate(registry, rng),
            NetworkGenotype::Cppn(g) => g.mutate(registry, rng),
        }
    }

    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self> {
        match (self, other) {
            (NetworkGenotype::Direct(a), NetworkGenotype::Direct(b)) => {
                a.crossover(b, registry, rng).map(NetworkGenotype::Direct)
            }
            (NetworkGenotype::Cppn(a), NetworkGenotype::Cppn(b)) => {
                a.crossover(b, registry, rng).map(NetworkGenotype::Cppn)
            }
            _ => Err(GenotypeError::TypeMismatch {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }

    fn copy(&self, registry: &IdentityRegistry) -> Self {
        match self {
            NetworkGenotype::Direct(g) => NetworkGenotype::Direct(g.copy(registry)),
            NetworkGenotype::Cppn(g) => NetworkGenotype::Cppn(g.copy(registry)),
        }
    }

    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self {
        match self {
            NetworkGenotype::Direct(g) => NetworkGenotype::Direct(g.new_instance(registry, rng)),
            NetworkGenotype::Cppn(g) => NetworkGenotype::Cppn(g.new_instance(registry, rng)),
        }
    }

    fn phenotype(&self) -> GenotypeResult<Network> {
        match self {
            NetworkGenotype::Direct(g) => g.phenotype(),
            NetworkGenotype::Cppn(g) => g.phenotype(),
        }
    }
}
