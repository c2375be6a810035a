//! Bounded real-vector genotype.
//!
//! Usually paired with a network genotype in a
//! [`CombinedGenotype`](crate::combined::CombinedGenotype) to evolve
//! continuous parameters alongside a controller.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{configuration, GenotypeError, GenotypeResult};
use crate::genotype::{Genotype, GenotypeKind};
use crate::registry::IdentityRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealValuedConfig {
    /// Number of genes.
    pub length: usize,
    /// Lower bound of every gene.
    pub lower: f64,
    /// Upper bound of every gene.
    pub upper: f64,
    /// Per-gene probability of a perturbation.
    pub mutation_prob: f64,
    /// Maximum magnitude of a perturbation.
    pub mutation_power: f64,
}

impl RealValuedConfig {
    /// Config with default mutation settings: each gene is perturbed with
    /// probability 0.1 by at most a tenth of the range.
    #[must_use]
    pub fn new(length: usize, lower: f64, upper: f64) -> Self {
        Self {
            length,
            lower,
            upper,
            mutation_prob: 0.1,
            mutation_power: (upper - lower) * 0.1,
        }
    }
}

/// A fixed-length vector of genes clamped to `[lower, upper]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealValuedGenotype {
    id: u64,
    genes: Vec<f64>,
    pub config: RealValuedConfig,
}

impl RealValuedGenotype {
    /// Uniformly random genes within bounds.
    ///
    /// # Panics
    ///
    /// Panics if `config.lower > config.upper`.
    #[must_use]
    pub fn random<R: Rng>(config: RealValuedConfig, registry: &IdentityRegistry, rng: &mut R) -> Self {
        assert!(
            config.lower <= config.upper,
            "lower bound {} exceeds upper bound {}",
            config.lower,
            config.upper
        );
        let genes = (0..config.length)
            .map(|_| rng.random_range(config.lower..=config.upper))
            .collect();
        Self {
            id: registry.next_genotype_id(),
            genes,
            config,
        }
    }

    /// Wrap existing genes.
    ///
    /// # Errors
    ///
    /// Returns [`GenotypeError::Configuration`] if the bounds are inverted and
    /// [`GenotypeError::StructuralInvariantViolation`] if the genes do not
    /// match `config.length` or leave the bounds.
    pub fn from_genes(
        genes: Vec<f64>,
        config: RealValuedConfig,
        registry: &IdentityRegistry,
    ) -> GenotypeResult<Self> {
        if !(config.lower <= config.upper) {
            return Err(configuration(format!(
                "lower bound {} exceeds upper bound {}",
                config.lower, config.upper
            )));
        }
        if genes.len() != config.length {
            return Err(GenotypeError::StructuralInvariantViolation(format!(
                "expected {} genes, got {}",
                config.length,
                genes.len()
            )));
        }
        if let Some(gene) = genes.iter().find(|g| !(config.lower..=config.upper).contains(*g)) {
            return Err(GenotypeError::StructuralInvariantViolation(format!(
                "gene {} outside [{}, {}]",
                gene, config.lower, config.upper
            )));
        }
        Ok(Self {
            id: registry.next_genotype_id(),
            genes,
            config,
        })
    }

    #[must_use]
    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl Genotype for RealValuedGenotype {
    type Phenotype = Vec<f64>;

    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> GenotypeKind {
        GenotypeKind::RealValued
    }

    fn mutate<R: Rng>(&mut self, _registry: &IdentityRegistry, rng: &mut R) {
        let RealValuedConfig {
            lower,
            upper,
            mutation_prob,
            mutation_power,
            ..
        } = self.config;
        for gene in &mut self.genes {
            if rng.random::<f64>() < mutation_prob {
                let delta = rng.random_range(-1.0..=1.0) * mutation_power;
                *gene = (*gene + delta).clamp(lower, upper);
            }
        }
    }

    /// Uniform crossover: each gene comes from either parent with equal
    /// probability.
    fn crossover<R: Rng>(
        &self,
        other: &Self,
        registry: &IdentityRegistry,
        rng: &mut R,
    ) -> GenotypeResult<Self> {
        if self.genes.len() != other.genes.len() {
            return Err(GenotypeError::StructuralInvariantViolation(format!(
                "cannot cross {} genes with {} genes",
                self.genes.len(),
                other.genes.len()
            )));
        }
        let genes = self
            .genes
            .iter()
            .zip(&other.genes)
            .map(|(&ours, &theirs)| if rng.random::<bool>() { theirs } else { ours })
            .collect();
        Ok(Self {
            id: registry.next_genotype_id(),
            genes,
            config: self.config.clone(),
        })
    }

    fn copy(&self, registry: &IdentityRegistry) -> Self {
        Self {
            id: registry.next_genotype_id(),
            ..self.clone()
        }
    }

    fn new_instance<R: Rng>(&self, registry: &IdentityRegistry, rng: &mut R) -> Self {
        Self::random(self.config.clone(), registry, rng)
    }

    fn phenotype(&self) -> GenotypeResult<Vec<f64>> {
        Ok(self.genes.clone())
    }
}
