//! Identity and innovation bookkeeping.
//!
//! An [`IdentityRegistry`] hands out genotype ids and gene innovation numbers.
//! It is an explicit context object: every constructor or operator that needs a
//! fresh id receives a `&IdentityRegistry`, so independent runs (and tests)
//! never share counters by accident.
//!
//! Besides the raw counters, the registry remembers structural mutations per
//! archetype. Two genomes of the same lineage that independently add the same
//! link, or split the same link, receive the same innovation number, which is
//! what lets crossover align their genes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Innovations below this value are reserved for the fixed input and output
/// node genes of randomly initialized genomes.
pub const RESERVED_INNOVATIONS: u64 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StructuralKey {
    Link { source: u64, target: u64 },
    Split { link: u64 },
}

/// Source of unique genotype ids and innovation numbers.
#[derive(Debug)]
pub struct IdentityRegistry {
    next_genotype: AtomicU64,
    next_innovation: AtomicU64,
    history: Mutex<HashMap<(i32, StructuralKey), u64>>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// Registry whose first genotype id is 0 and whose first innovation is
    /// [`RESERVED_INNOVATIONS`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_genotype: AtomicU64::new(0),
            next_innovation: AtomicU64::new(RESERVED_INNOVATIONS),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Next unused genotype id.
    pub fn next_genotype_id(&self) -> u64 {
        self.next_genotype.fetch_add(1, Ordering::Relaxed)
    }

    /// Next unused innovation number.
    pub fn next_innovation(&self) -> u64 {
        self.next_innovation.fetch_add(1, Ordering::Relaxed)
    }

    /// Declare `id` as the highest genotype id in use; the next id is `id + 1`
    /// (saturating at `u64::MAX`).
    pub fn set_highest_genotype_id(&self, id: u64) {
        self.next_genotype.store(id.saturating_add(1), Ordering::Relaxed);
    }

    /// Set the next innovation number to hand out.
    pub fn set_innovation(&self, next: u64) {
        self.next_innovation.store(next, Ordering::Relaxed);
    }

    /// Innovation of a link from `source` to `target` within `archetype`.
    ///
    /// The first request for a pair allocates a fresh innovation; later
    /// requests for the same pair in the same archetype return it again.
    pub fn link_innovation(&self, archetype: i32, source: u64, target: u64) -> u64 {
        self.structural(archetype, StructuralKey::Link { source, target })
    }

    /// Innovation of the hidden node created by splitting link `link`.
    pub fn split_innovation(&self, archetype: i32, link: u64) -> u64 {
        self.structural(archetype, StructuralKey::Split { link })
    }

    /// Forget remembered structural mutations.
    ///
    /// Innovations already handed out stay unique; only reuse stops.
    pub fn clear_structural_history(&self) {
        self.history.lock().clear();
    }

    fn structural(&self, archetype: i32, key: StructuralKey) -> u64 {
        let mut history = self.history.lock();
        *history
            .entry((archetype, key))
            .or_insert_with(|| self.next_innovation())
    }
}
