//! Order statistics.
//!
//! Sorting is always stable: equal values keep their input order. The bin
//! strategy quantizes values with `floor` and buckets them, which is exact for
//! integer-valued data and much cheaper than comparisons on large inputs with
//! a small value range.

use crate::sparse_array::{ShiftPolicy, SparseArray, SparseArrayError};
use serde::{Deserialize, Serialize};

/// Widest value range the bin sort accepts.
const MAX_BINS: usize = 1 << 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    #[default]
    Comparison,
    /// Counting sort over `floor(value)`; falls back to `Comparison` for
    /// non-finite values or ranges wider than 2^20.
    Bins,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Indices of `values` in sorted order.
pub fn sort_indices(values: &[f64], order: SortOrder, strategy: SortStrategy) -> Vec<usize> {
    match strategy {
        SortStrategy::Comparison => comparison_sort_indices(values, order),
        SortStrategy::Bins => bin_sort_indices(values, order).unwrap_or_else(|| {
            log::debug!("bin sort not applicable, using comparison sort");
            comparison_sort_indices(values, order)
        }),
    }
}

fn comparison_sort_indices(values: &[f64], order: SortOrder) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        let ord = values[a].total_cmp(&values[b]);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
    idx
}

/// One bin of the bin sort: input indices whose values floor to `key`.
struct Bin {
    key: usize,
    members: Vec<usize>,
}

fn bin_sort_indices(values: &[f64], order: SortOrder) -> Option<Vec<usize>> {
    if values.is_empty() {
        return Some(Vec::new());
    }
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v.floor()), hi.max(v.floor()))
        });
    if hi - lo >= MAX_BINS as f64 {
        return None;
    }
    let nbins = (hi - lo) as usize + 1;

    // Bins live in an array sized to the input, not to the value range, so
    // distinct keys can share a home slot and get shifted apart.
    let capacity = nbins.min(values.len());
    let mut bins: SparseArray<Bin> = SparseArray::with_capacity(capacity);
    for (i, v) in values.iter().enumerate() {
        let key = (v.floor() - lo) as usize;
        let home = (key as u128 * capacity as u128 / nbins as u128) as usize;
        place_in_bin(&mut bins, key, i, home).ok()?;
    }
    bins.compact();

    let mut sorted = Vec::with_capacity(values.len());
    match order {
        SortOrder::Ascending => {
            for slot in 0..bins.next_index() {
                if let Some(bin) = bins.remove(slot) {
                    sorted.extend(bin.members);
                }
            }
        }
        SortOrder::Descending => {
            while let Some(bin) = bins.remove_last() {
                sorted.extend(bin.members);
            }
        }
    }
    debug_assert!(bins.is_empty());
    Some(sorted)
}

/// Add input index `member` to the bin for `key`, creating the bin if needed.
///
/// Bins are kept in ascending key order and never sit below their home slot,
/// so every bin with a key `>= key` is at or after `home`.
fn place_in_bin(
    bins: &mut SparseArray<Bin>,
    key: usize,
    member: usize,
    home: usize,
) -> Result<(), SparseArrayError> {
    let next = bins.next_index();
    let mut at = home;
    // First hole after the last smaller bin, if the scan crossed one.
    let mut gap = None;
    while at < next {
        match bins.get(at) {
            None => {
                gap.get_or_insert(at);
            }
            Some(bin) if bin.key < key => gap = None,
            Some(_) => break,
        }
        at += 1;
    }

    if let Some(bin) = bins.get_mut(at) {
        if bin.key == key {
            bin.members.push(member);
            return Ok(());
        }
    }
    let bin = Bin {
        key,
        members: vec![member],
    };
    if at >= next {
        if home > next {
            return bins.insert(home, bin, ShiftPolicy::Auto);
        }
        bins.push(bin);
        return Ok(());
    }
    if let Some(hole) = gap {
        return bins.insert(hole, bin, ShiftPolicy::Auto);
    }
    bins.insert(at, bin, ShiftPolicy::Auto)
}

/// Value at rank `fraction` in `[0, 1]` of the ascending order; 0 is the
/// minimum, 1 the maximum. The rank index is `round(fraction * (n - 1))`.
///
/// Returns `None` for empty input or a fraction outside `[0, 1]`.
pub fn rank_value(values: &[f64], fraction: f64, strategy: SortStrategy) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    let order = sort_indices(values, SortOrder::Ascending, strategy);
    let index = (fraction * (values.len() - 1) as f64 + 0.5) as usize;
    order.get(index).map(|&i| values[i])
}

pub fn median(values: &[f64]) -> Option<f64> {
    rank_value(values, 0.5, SortStrategy::Comparison)
}

/// Median and median absolute deviation from it.
pub fn median_variation(values: &[f64]) -> Option<(f64, f64)> {
    let med = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    Some((med, median(&deviations)?))
}
