//! Integer pro-rata apportionment.
//!
//! Splits an integer total across weights so the parts sum to exactly the
//! total. Floors first, then hands the leftover units to the largest
//! remainders (Hamilton's method). Ties go to the lower index, so the result
//! depends only on input order.

/// Split `total` across `weights` in proportion. Parts always sum to
/// `total` unless every weight is zero, in which case all parts are zero.
#[must_use]
pub fn apportion(total: u64, weights: &[u64]) -> Vec<u64> {
    let weight_sum: u128 = weights.iter().map(|w| u128::from(*w)).sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }

    let total_wide = u128::from(total);
    let mut parts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: u128 = 0;

    for (idx, weight) in weights.iter().enumerate() {
        let scaled = total_wide * u128::from(*weight);
        let floor = scaled / weight_sum;
        assigned += floor;
        parts.push(floor);
        remainders.push((scaled % weight_sum, idx));
    }

    // Largest remainder first, lower index on ties.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let leftover = total_wide - assigned;
    for (_, idx) in remainders.into_iter().take(usize::try_from(leftover).unwrap_or(usize::MAX)) {
        parts[idx] += 1;
    }

    // Each part is at most `total`, which fits in u64.
    parts
        .into_iter()
        .map(|p| u64::try_from(p).unwrap_or(u64::MAX))
        .collect()
}
