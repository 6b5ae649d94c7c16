//! Stable descending ranking.

/// Indices of `values` ordered from largest to smallest value.
///
/// The sort is stable: equal values keep their original relative order, so the
/// earlier index wins a tie.
///
/// ```rust
/// use cmale::rank::descending_rank;
///
/// assert_eq!(descending_rank(&[3.0, 5.0, 5.0, 2.0]), vec![1, 2, 0, 3]);
/// assert_eq!(descending_rank(&[1.2, 2.3, 0.4, 0.5]), vec![1, 0, 3, 2]);
/// ```
pub fn descending_rank(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    // `sort_by` is a stable merge sort.
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_without_ties() {
        assert_eq!(
            descending_rank(&[3.1, 5.2, 6.3, 2.1, 4.4]),
            vec![2, 1, 4, 0, 3]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        assert_eq!(descending_rank(&[0.0, 0.0, 0.0]), vec![0, 1, 2]);
        assert_eq!(descending_rank(&[1.0, 2.0, 1.0, 2.0]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn empty_and_single() {
        assert!(descending_rank(&[]).is_empty());
        assert_eq!(descending_rank(&[7.0]), vec![0]);
    }
}
