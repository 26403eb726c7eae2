//! Local extrema of the moving average.
//!
//! A bar is a local minimum when its MA is strictly below both neighbours and
//! a local maximum when strictly above both. Ties are never extrema. Because
//! the right neighbour must exist, a bar can only be classified once the next
//! bar has closed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtremumKind {
    Minimum,
    Maximum,
}

/// Classify the middle of three consecutive MA values.
pub fn classify(prev: f64, mid: f64, next: f64) -> Option<ExtremumKind> {
    if mid < prev && mid < next {
        Some(ExtremumKind::Minimum)
    } else if mid > prev && mid > next {
        Some(ExtremumKind::Maximum)
    } else {
        None
    }
}

/// Indices of every interior extremum in a series, for whole-series inspection.
pub fn find_extrema(values: &[f64]) -> Vec<(usize, ExtremumKind)> {
    values
        .windows(3)
        .enumerate()
        .filter_map(|(i, w)| classify(w[0], w[1], w[2]).map(|kind| (i + 1, kind)))
        .collect()
}

/// The two most recent extremum MA values. Nothing older is retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremaHistory {
    pub last: Option<f64>,
    pub second_last: Option<f64>,
}

impl ExtremaHistory {
    pub fn push(&mut self, value: f64) {
        self.second_last = self.last;
        self.last = Some(value);
    }

    /// |last − second_last|, defined once two extrema have been seen.
    pub fn amplitude(&self) -> Option<f64> {
        match (self.last, self.second_last) {
            (Some(last), Some(second)) => Some((last - second).abs()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_minimum_and_maximum() {
        assert_eq!(classify(3.0, 1.0, 2.0), Some(ExtremumKind::Minimum));
        assert_eq!(classify(1.0, 3.0, 2.0), Some(ExtremumKind::Maximum));
        assert_eq!(classify(1.0, 2.0, 3.0), None);
    }

    #[test]
    fn ties_are_not_extrema() {
        assert_eq!(classify(1.0, 1.0, 2.0), None);
        assert_eq!(classify(2.0, 1.0, 1.0), None);
        assert_eq!(classify(2.0, 2.0, 2.0), None);
        assert_eq!(classify(1.0, 2.0, 2.0), None);
    }

    #[test]
    fn find_extrema_reports_interior_indices() {
        let series = [5.0, 4.0, 3.0, 4.0, 5.0, 4.0];
        assert_eq!(
            find_extrema(&series),
            vec![(2, ExtremumKind::Minimum), (4, ExtremumKind::Maximum)]
        );
    }

    #[test]
    fn endpoints_are_never_extrema() {
        assert!(find_extrema(&[1.0, 2.0]).is_empty());
        assert!(find_extrema(&[]).is_empty());
    }

    #[test]
    fn history_keeps_two_most_recent() {
        let mut h = ExtremaHistory::default();
        assert_eq!(h.amplitude(), None);

        h.push(10.0);
        assert_eq!(h.amplitude(), None);

        h.push(12.5);
        assert!((h.amplitude().unwrap() - 2.5).abs() < f64::EPSILON);

        h.push(11.0);
        assert_eq!(h.last, Some(11.0));
        assert_eq!(h.second_last, Some(12.5));
        assert!((h.amplitude().unwrap() - 1.5).abs() < f64::EPSILON);
    }
}
