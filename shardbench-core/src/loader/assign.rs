//! Deterministic work assignment

use tracing::debug;

/// Deal `items` to `num_workers` workers round-robin
///
/// Item `i` goes to worker `i % num_workers`, preserving order within each
/// worker. Zero workers is treated as one. Always returns `num_workers`
/// lists, some possibly empty.
pub fn assign<T>(items: Vec<T>, num_workers: usize) -> Vec<Vec<T>> {
    let num_workers = num_workers.max(1);
    let total = items.len();

    let mut assignments: Vec<Vec<T>> = (0..num_workers)
        .map(|_| Vec::with_capacity(total.div_ceil(num_workers)))
        .collect();
    for (idx, item) in items.into_iter().enumerate() {
        assignments[idx % num_workers].push(item);
    }

    debug!("Assigned {} work items to {} workers", total, num_workers);
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let assignments = assign((0..10).collect(), 3);
        assert_eq!(
            assignments,
            vec![vec![0, 3, 6, 9], vec![1, 4, 7], vec![2, 5, 8]]
        );
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(assign(vec!['a', 'b'], 0), vec![vec!['a', 'b']]);
    }

    #[test]
    fn test_more_workers_than_items() {
        let assignments = assign(vec![1], 4);
        assert_eq!(assignments.len(), 4);
        let total: usize = assignments.iter().map(Vec::len).sum();
        assert_eq!(total, 1);
    }
}
