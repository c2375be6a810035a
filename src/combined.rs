//! Product of two genotypes.
//!
//! A [`CombinedGenotype`] evolves two independent encodings side by side, for
//! example a controller network together with a vector of body parameters.
//! Each component keeps its own id; the pair gets a third one.

use rand::Rng;

use crate::error::{GenotypeError, GenotypeResult};
use crate::genotype::{Genotype, GenotypeKind};
use crate::registry::IdentityRegistry;

/// Two genotypes evolved as one individual.
#[derive(Debug, Clone)]
pub struct CombinedGenotype<X, Y> {
    id: u64,
    pub first: X,
    pub second: Y,
}

impl<X: Genotype, Y: Genotype> CombinedGenotype<X, Y> {
    /// Pair two components under a fresh id.
    #[must_use]
    pub fn new(first: X, second: Y, registry: &IdentityRegistry) -> Self {
        Self {
            id: registry.next_genotype_id(),
            first,
            second,
        }
    }
}

impl<X: Genotype, Y: Genotype> Genotype for CombinedGenotype<X, Y> {
    type Phenotype = (X::Phenotype, Y::Phenotype);

    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> GenotypeKind {
        GenotypeKind::Combined(Box::new(self.first.kind()), Box::new(self.second.kind()))
    }

    fn mutate<R: Rng>(&mut self, registry: &IdentityRegistry, rng: &mut R) {
        self.first.mutate(registry, rng);
        self.second.mutate(registry, rng);
    }

    /// Cross components pairwise. Both component kinds are compared before
    /// either crossover runs.
    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self> {
        if self.first.kind() != other.first.kind() || self.second.kind() != other.second.kind() {
            return Err(GenotypeError::TypeMismatch {
                expected: self.kind(),
                found: other.kind(),
            });
        }
        let first = self.first.crossover(&other.first, registry, rng)?;
        let second = self.second.crossover(&other.second, registry, rng)?;
        Ok(Self::new(first, second, registry))
    }

    fn copy(&self, registry: &IdentityRegistry) -> Self {
        Self::new(self.first.copy(registry), self.second.copy(registry), registry)
    }

    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self {
        Self::new(
            self.first.new_instance(registry, rng),
            self.second.new_instance(registry, rng),
            registry,
        )
    }

    fn phenotype(&self) -> GenotypeResult<Self::Phenotype> {
        Ok((self.first.phenotype()?, self.second.phenotype()?))
    }
}
