//! Evaluation planning in CSR form.
//!
//! A [`EvaluationPlan`] is a snapshot of a network's synapses over dense
//! neuron indices. Incoming edges are stored in Compressed Sparse Row layout
//! and sorted by innovation number, so the weighted sums computed during
//! evaluation are bit-identical regardless of gene order.
//!
//! Acyclic graphs are evaluated in Kahn order. Neurons left over by Kahn's
//! algorithm sit on cycles; they are appended in index order and read the
//! previous activation of any predecessor that has not been updated yet.

use std::collections::VecDeque;

/// A synapse between dense neuron indices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
    pub innovation: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationPlan {
    /// For neuron i, incoming edges live at `offsets[i]..offsets[i + 1]`.
    offsets: Vec<usize>,
    sources: Vec<usize>,
    weights: Vec<f64>,
    /// Non-input neurons in update order.
    order: Vec<usize>,
    recurrent: bool,
}

impl EvaluationPlan {
    /// Build a plan for `node_count` neurons. Neurons flagged in `is_input`
    /// are set externally and never appear in the update order.
    pub fn build(node_count: usize, mut edges: Vec<Edge>, is_input: &[bool]) -> Self {
        debug_assert_eq!(is_input.len(), node_count);
        edges.sort_by_key(|e| e.innovation);

        let mut in_counts = vec![0usize; node_count];
        let mut out_counts = vec![0usize; node_count];
        for edge in &edges {
            in_counts[edge.target] += 1;
            out_counts[edge.source] += 1;
        }

        let offsets = prefix_offsets(&in_counts);
        let mut sources = vec![0usize; edges.len()];
        let mut weights = vec![0.0f64; edges.len()];
        let mut write_pos = offsets[..node_count].to_vec();
        for edge in &edges {
            let pos = write_pos[edge.target];
            sources[pos] = edge.source;
            weights[pos] = edge.weight;
            write_pos[edge.target] += 1;
        }

        let fwd_offsets = prefix_offsets(&out_counts);
        let mut fwd_targets = vec![0usize; edges.len()];
        let mut fwd_write = fwd_offsets[..node_count].to_vec();
        for edge in &edges {
            fwd_targets[fwd_write[edge.source]] = edge.target;
            fwd_write[edge.source] += 1;
        }

        // Kahn's algorithm over the forward CSR.
        let mut in_degree = in_counts;
        let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();
        let mut placed = vec![false; node_count];
        let mut sorted = Vec::with_capacity(node_count);
        while let Some(u) = queue.pop_front() {
            placed[u] = true;
            sorted.push(u);
            for &v in &fwd_targets[fwd_offsets[u]..fwd_offsets[u + 1]] {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        let recurrent = sorted.len() != node_count;
        if recurrent {
            sorted.extend((0..node_count).filter(|&i| !placed[i]));
        }
        let order = sorted.into_iter().filter(|&i| !is_input[i]).collect();

        Self {
            offsets,
            sources,
            weights,
            order,
            recurrent,
        }
    }

    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Incoming `(source, weight)` pairs of a neuron, in innovation order.
    #[inline]
    pub fn incoming(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[idx]..self.offsets[idx + 1];
        self.sources[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// Whether the synapses contain at least one cycle.
    #[inline]
    pub fn is_recurrent(&self) -> bool {
        self.recurrent
    }

    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }
}

fn prefix_offsets(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut total = 0;
    offsets.push(0);
    for &count in counts {
        total += count;
        offsets.push(total);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: usize, target: usize, weight: f64, innovation: u64) -> Edge {
        Edge {
            source,
            target,
            weight,
            innovation,
        }
    }

    #[test]
    fn test_feedforward_order() {
        // 0 -> 2 -> 1, with 0 as the only input
        let plan = EvaluationPlan::build(
            3,
            vec![edge(2, 1, 0.5, 11), edge(0, 2, 1.0, 10)],
            &[true, false, false],
        );
        assert!(!plan.is_recurrent());
        assert_eq!(plan.order(), &[2, 1]);
        assert_eq!(plan.num_edges(), 2);
    }

    #[test]
    fn test_incoming_sorted_by_innovation() {
        let plan = EvaluationPlan::build(
            3,
            vec![edge(1, 2, 0.2, 9), edge(0, 2, 0.1, 3)],
            &[true, true, false],
        );
        let incoming: Vec<(usize, f64)> = plan.incoming(2).collect();
        assert_eq!(incoming, vec![(0, 0.1), (1, 0.2)]);
    }

    #[test]
    fn test_cycle_is_appended_in_index_order() {
        // 1 <-> 2 cycle fed by input 0
        let plan = EvaluationPlan::build(
            3,
            vec![edge(0, 1, 1.0, 1), edge(1, 2, 1.0, 2), edge(2, 1, 1.0, 3)],
            &[true, false, false],
        );
        assert!(plan.is_recurrent());
        assert_eq!(plan.order(), &[1, 2]);
    }
}
