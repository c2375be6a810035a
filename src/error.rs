//! Error types shared by every genotype in the crate.

use thiserror::Error;
use tracing::warn;

use crate::genotype::GenotypeKind;

/// Result type for genotype operations.
pub type GenotypeResult<T> = Result<T, GenotypeError>;

/// Failures raised while decoding or recombining genotypes.
///
/// None of these are recoverable for the genome involved: they indicate either
/// a setup bug (configuration, variant mixing) or a corrupted genome, and the
/// caller is expected to abort the evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenotypeError {
    /// The substrate topology or the CPPN arity does not fit the decoder.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Crossover between two different genotype variants.
    #[error("cannot cross a {expected} genotype with a {found} genotype")]
    TypeMismatch {
        expected: GenotypeKind,
        found: GenotypeKind,
    },

    /// Crossover between genomes of unrelated lineages.
    #[error("cannot cross archetype {ours} with archetype {theirs}")]
    ArchetypeMismatch { ours: i32, theirs: i32 },

    /// Duplicate innovation numbers or a link naming an unknown node.
    #[error("structural invariant violated: {0}")]
    StructuralInvariantViolation(String),
}

/// Build a [`GenotypeError::Configuration`], logging it at warn level.
pub(crate) fn configuration(message: String) -> GenotypeError {
    warn!("invalid configuration: {}", message);
    GenotypeError::Configuration(message)
}
