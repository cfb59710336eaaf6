//! Evaluation grids: stepped, linearly spaced and log spaced ranges

use crate::core::error::{Result, SlatError};

/// A stepped range from `start` while the value stays within `stop + step/2`.
///
/// The half step guards the final point against rounding. A step that is
/// zero, negative or NaN yields an empty sequence. The range is restartable:
/// every call to [`FRange::iter`] starts again from `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl FRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    pub fn iter(&self) -> FRangeIter {
        FRangeIter {
            range: *self,
            index: 0,
        }
    }
}

impl IntoIterator for &FRange {
    type Item = f64;
    type IntoIter = FRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct FRangeIter {
    range: FRange,
    index: u64,
}

impl Iterator for FRangeIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let FRange { start, stop, step } = self.range;
        if !(step > 0.0) {
            return None;
        }
        // Multiply rather than accumulate so long ranges do not drift
        let value = start + self.index as f64 * step;
        if value <= stop + step / 2.0 {
            self.index += 1;
            Some(value)
        } else {
            None
        }
    }
}

/// Shorthand for `FRange::new(start, stop, step)`
pub fn frange(start: f64, stop: f64, step: f64) -> FRange {
    FRange::new(start, stop, step)
}

/// Exactly `count` equally spaced values from `start` to `end` inclusive
pub fn linrange(start: f64, end: f64, count: usize) -> Result<Vec<f64>> {
    if count < 2 {
        return Err(SlatError::domain(format!(
            "linrange needs at least 2 points, got {}",
            count
        )));
    }
    let step = (end - start) / (count - 1) as f64;
    let mut values: Vec<f64> = (0..count).map(|k| start + k as f64 * step).collect();
    values[count - 1] = end;
    Ok(values)
}

/// `count` log-spaced values from `start` to `end` inclusive
pub fn logrange(start: f64, end: f64, count: usize) -> Result<Vec<f64>> {
    if count < 2 {
        return Err(SlatError::domain(format!(
            "logrange needs at least 2 points, got {}",
            count
        )));
    }
    if !(start > 0.0 && end > 0.0) {
        return Err(SlatError::domain(format!(
            "logrange bounds must be positive, got {} and {}",
            start, end
        )));
    }
    let ln_start = start.ln();
    let ln_step = (end / start).ln() / (count - 1) as f64;
    let mut values: Vec<f64> = (0..count)
        .map(|k| (ln_start + k as f64 * ln_step).exp())
        .collect();
    values[0] = start;
    values[count - 1] = end;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "{} != {}", a, b);
    }

    #[test]
    fn test_frange_includes_stop_despite_rounding() {
        let values: Vec<f64> = frange(0.0, 1.0, 0.1).iter().collect();
        assert_eq!(values.len(), 11);
        assert_close(values[10], 1.0);
    }

    #[test]
    fn test_frange_is_restartable() {
        let range = frange(0.01, 0.05, 0.01);
        let first: Vec<f64> = range.iter().collect();
        let second: Vec<f64> = (&range).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn test_frange_bad_step_is_empty() {
        assert_eq!(frange(0.0, 1.0, 0.0).iter().count(), 0);
        assert_eq!(frange(0.0, 1.0, -0.5).iter().count(), 0);
        assert_eq!(frange(2.0, 1.0, 0.5).iter().count(), 0);
    }

    #[test]
    fn test_linrange_endpoints_and_length() {
        let values = linrange(0.2, 1.9, 7).unwrap();
        assert_eq!(values.len(), 7);
        assert_eq!(values[0], 0.2);
        assert_eq!(values[6], 1.9);
        assert!(values.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_linrange_single_point_is_domain_error() {
        assert!(matches!(linrange(0.0, 1.0, 1), Err(SlatError::Domain { .. })));
    }

    #[test]
    fn test_logrange_decades() {
        let values = logrange(1.0, 100.0, 3).unwrap();
        assert_eq!(values.len(), 3);
        assert_close(values[0], 1.0);
        assert_close(values[1], 10.0);
        assert_close(values[2], 100.0);
    }

    #[test]
    fn test_logrange_constant_ratio() {
        let values = logrange(0.01, 3.0, 12).unwrap();
        let ratio = values[1] / values[0];
        for w in values.windows(2) {
            assert_close(w[1] / w[0], ratio);
        }
    }

    #[test]
    fn test_logrange_rejects_non_positive_bounds() {
        assert!(logrange(0.0, 1.0, 5).is_err());
        assert!(logrange(1.0, -1.0, 5).is_err());
        assert!(logrange(1.0, 2.0, 0).is_err());
    }
}
