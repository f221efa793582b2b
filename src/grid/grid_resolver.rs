//! Nearest-grid-point lookup on a sorted coordinate axis.

use crate::grid::error::GridError;
use std::cmp::Ordering;

/// Result of a nearest-value search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMatch {
    /// Position of the match in the axis.
    pub index: usize,
    /// The axis value at `index`.
    pub value: f64,
    /// Whether `value` equals the target exactly.
    pub exact: bool,
}

/// An ascending sequence of coordinate values for one spatial dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridAxis(Vec<f64>);

impl GridAxis {
    /// Wraps values the caller guarantees to be ascending.
    pub fn from_sorted(values: Vec<f64>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] <= w[1]));
        Self(values)
    }

    /// Sorts and deduplicates `values`.
    pub fn from_unsorted(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        values.dedup();
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact membership test.
    pub fn contains(&self, value: f64) -> bool {
        self.0
            .binary_search_by(|v| v.partial_cmp(&value).unwrap_or(Ordering::Less))
            .is_ok()
    }

    pub fn nearest(&self, target: f64) -> Result<GridMatch, GridError> {
        nearest(&self.0, target)
    }
}

/// Finds the element of the ascending `axis` closest to `target`.
///
/// Runs a standard binary search. An exact hit returns immediately. Otherwise the closest probe
/// seen so far is kept, and a later probe only replaces it when strictly closer. On ties the first
/// probe found wins, which is not necessarily the lower index.
///
/// # Errors
///
/// [`GridError::EmptyAxis`] for an empty axis, [`GridError::NonFiniteTarget`] for NaN or infinite targets.
///
/// # Examples
///
/// ```
/// use wave_reanalysis::nearest;
///
/// let axis = [41.96, 41.98, 42.00, 42.02];
/// let found = nearest(&axis, 41.991).unwrap();
/// assert_eq!((found.index, found.value, found.exact), (2, 42.00, false));
/// ```
pub fn nearest(axis: &[f64], target: f64) -> Result<GridMatch, GridError> {
    search(axis, target).map(|(found, _)| found)
}

/// Same as [`nearest`], also returning the number of probes made.
pub(crate) fn search(axis: &[f64], target: f64) -> Result<(GridMatch, usize), GridError> {
    if axis.is_empty() {
        return Err(GridError::EmptyAxis);
    }
    if !target.is_finite() {
        return Err(GridError::NonFiniteTarget(target));
    }

    let mut left = 0usize;
    let mut right = axis.len() - 1;
    let mut closest: Option<usize> = None;
    let mut probes = 0usize;

    while left <= right {
        let mid = left + (right - left) / 2;
        let value = axis[mid];
        probes += 1;

        if value == target {
            return Ok((
                GridMatch {
                    index: mid,
                    value,
                    exact: true,
                },
                probes,
            ));
        }

        match closest {
            Some(best) if (value - target).abs() >= (axis[best] - target).abs() => {}
            _ => closest = Some(mid),
        }

        if value < target {
            left = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            right = mid - 1;
        }
    }

    let index = closest.ok_or(GridError::EmptyAxis)?;
    Ok((
        GridMatch {
            index,
            value: axis[index],
            exact: false,
        },
        probes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_axis(len: usize, start: f64, step: f64) -> Vec<f64> {
        (0..len).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_exact_match() {
        let axis = [27.09, 27.11, 27.13, 27.15, 27.17];
        for (i, v) in axis.iter().enumerate() {
            let found = nearest(&axis, *v).unwrap();
            assert_eq!(found, GridMatch { index: i, value: *v, exact: true });
        }
    }

    #[test]
    fn test_closest_when_absent() {
        let axis = [0.0, 1.0, 2.0, 4.0, 8.0];
        assert_eq!(nearest(&axis, 2.9).unwrap().value, 2.0);
        assert_eq!(nearest(&axis, 3.1).unwrap().value, 4.0);
        assert_eq!(nearest(&axis, 6.5).unwrap().index, 4);
        assert_eq!(nearest(&axis, -5.0).unwrap().index, 0);
        assert_eq!(nearest(&axis, 100.0).unwrap().index, 4);
        assert!(!nearest(&axis, 3.1).unwrap().exact);
    }

    #[test]
    fn test_result_has_minimum_distance() {
        let axis = linear_axis(257, 41.9582, 0.0069);
        for k in 0..2000 {
            let target = 41.90 + k as f64 * 0.001;
            let found = nearest(&axis, target).unwrap();
            let best = axis
                .iter()
                .map(|v| (v - target).abs())
                .fold(f64::INFINITY, f64::min);
            assert_eq!((found.value - target).abs(), best, "target {target}");
        }
    }

    #[test]
    fn test_tie_keeps_first_found_candidate() {
        let axis = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        // Probes 3.0, then 5.0 (distance 0.5), then 4.0 (also 0.5). The first one found is kept.
        let found = nearest(&axis, 4.5).unwrap();
        assert_eq!(found.index, 5);
        assert_eq!(found.value, 5.0);

        // Probes 1.0 (distance 0.5), then 2.0 (also 0.5).
        let found = nearest(&[0.0, 1.0, 2.0, 3.0], 1.5).unwrap();
        assert_eq!(found.index, 1);
    }

    #[test]
    fn test_probe_count_is_logarithmic() {
        for len in 1..=1024usize {
            let axis = linear_axis(len, 0.0, 1.0);
            let bound = (usize::BITS - len.leading_zeros()) as usize;
            for target in [-1.0, 0.25, len as f64 / 3.0 + 0.1, len as f64 + 1.0] {
                let (_, probes) = search(&axis, target).unwrap();
                assert!(probes <= bound, "len {len}, target {target}: {probes} > {bound}");
            }
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let axis = GridAxis::from_unsorted(vec![42.3, 41.96, 42.1, 42.3, 43.74]);
        assert_eq!(axis.values(), &[41.96, 42.1, 42.3, 43.74]);
        let first = axis.nearest(42.2).unwrap();
        let second = axis.nearest(42.2).unwrap();
        assert_eq!(first, second);
        assert!(axis.contains(42.1));
        assert!(!axis.contains(42.2));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(nearest(&[], 1.0), Err(GridError::EmptyAxis));
        assert_eq!(GridAxis::default().nearest(1.0), Err(GridError::EmptyAxis));
        assert!(matches!(
            nearest(&[1.0, 2.0], f64::NAN),
            Err(GridError::NonFiniteTarget(_))
        ));
    }
}
