//! Fragility functions: damage-state onset distributions over demand

use std::fmt;

use crate::core::error::{Result, SlatError};
use crate::math::lognormal::LogNormalDist;

/// Ordered onset distributions for damage states 1..N
#[derive(Debug, Clone)]
pub struct FragilityFn {
    id: String,
    onsets: Vec<LogNormalDist>,
}

impl FragilityFn {
    /// Onsets must be non-empty and ordered by strictly increasing median
    pub fn new(id: impl Into<String>, onsets: Vec<LogNormalDist>) -> Result<Self> {
        let id = id.into();
        if onsets.is_empty() {
            return Err(SlatError::shape(format!("fragility function '{}'", id), 1, 0));
        }
        if onsets.windows(2).any(|w| !(w[1].mean_ln() > w[0].mean_ln())) {
            return Err(SlatError::invalid(
                format!("damage state order in '{}'", id),
                "non-increasing medians",
                &["onset medians strictly increasing with damage state"],
            ));
        }
        Ok(Self { id, onsets })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of damage states
    pub fn size(&self) -> usize {
        self.onsets.len()
    }

    pub fn onsets(&self) -> &[LogNormalDist] {
        &self.onsets
    }

    /// P(DS >= i | EDP = edp) for each state, non-increasing in i
    pub fn p_exceeded(&self, edp: f64) -> Vec<f64> {
        let mut bound = 1.0f64;
        self.onsets
            .iter()
            .map(|d| {
                bound = bound.min(d.p_at_most(edp));
                bound
            })
            .collect()
    }

    /// P(DS = i | EDP = edp): the highest state reached
    pub fn p_highest(&self, edp: f64) -> Vec<f64> {
        exact_states(&self.p_exceeded(edp))
    }
}

/// Difference exceedance probabilities into exact-state probabilities
pub fn exact_states(exceeded: &[f64]) -> Vec<f64> {
    exceeded
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let next = exceeded.get(i + 1).copied().unwrap_or(0.0);
            (p - next).max(0.0)
        })
        .collect()
}

impl fmt::Display for FragilityFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} damage states", self.id, self.onsets.len())?;
        for (i, d) in self.onsets.iter().enumerate() {
            write!(f, "\n  DS{}: median={}, sd_ln={}", i + 1, d.median(), d.sd_ln())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag() -> FragilityFn {
        FragilityFn::new(
            "FRAG_1",
            vec![
                LogNormalDist::from_median_sigma_ln(0.0062, 0.4),
                LogNormalDist::from_median_sigma_ln(0.0230, 0.4),
                LogNormalDist::from_median_sigma_ln(0.0440, 0.4),
                LogNormalDist::from_median_sigma_ln(0.0564, 0.4),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_exceedance_is_monotone_across_states() {
        let f = frag();
        for edp in [0.001, 0.005, 0.02, 0.05, 0.1] {
            let p = f.p_exceeded(edp);
            assert_eq!(p.len(), 4);
            assert!(p.windows(2).all(|w| w[0] >= w[1]), "{:?}", p);
        }
    }

    #[test]
    fn test_monotone_even_when_dispersions_cross() {
        let f = FragilityFn::new(
            "F",
            vec![
                LogNormalDist::from_median_sigma_ln(0.01, 0.1),
                LogNormalDist::from_median_sigma_ln(0.011, 1.5),
            ],
        )
        .unwrap();
        let p = f.p_exceeded(0.001);
        assert!(p[0] >= p[1]);
    }

    #[test]
    fn test_highest_state_probabilities_sum_to_exceeding_first() {
        let f = frag();
        let edp = 0.03;
        let highest = f.p_highest(edp);
        let total: f64 = highest.iter().sum();
        assert!((total - f.p_exceeded(edp)[0]).abs() < 1e-12);
        assert!(highest.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_empty_and_unordered_rejected() {
        assert!(matches!(
            FragilityFn::new("F", vec![]),
            Err(SlatError::ShapeMismatch { .. })
        ));
        let unordered = FragilityFn::new(
            "F",
            vec![
                LogNormalDist::from_median_sigma_ln(0.02, 0.4),
                LogNormalDist::from_median_sigma_ln(0.01, 0.4),
            ],
        );
        assert!(matches!(unordered, Err(SlatError::InvalidValue { .. })));
    }

    #[test]
    fn test_exact_states_last_state_unchanged() {
        assert_eq!(exact_states(&[0.75, 0.5, 0.125]), vec![0.25, 0.375, 0.125]);
    }
}
