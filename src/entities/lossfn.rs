//! Loss functions: per damage state cost or delay distributions

use std::fmt;

use crate::core::error::{Result, SlatError};
use crate::math::lognormal::LogNormalDist;

/// Loss given each damage state, for one component
#[derive(Debug, Clone)]
pub struct LossFn {
    id: String,
    states: Vec<LogNormalDist>,
}

impl LossFn {
    pub fn new(id: impl Into<String>, states: Vec<LogNormalDist>) -> Result<Self> {
        let id = id.into();
        if states.is_empty() {
            return Err(SlatError::shape(format!("loss function '{}'", id), 1, 0));
        }
        Ok(Self { id, states })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[LogNormalDist] {
        &self.states
    }

    /// Loss for `count` components whose damage-state probabilities are
    /// `probabilities`, one per state.
    ///
    /// Callers hold a fragility function of the same size; component groups
    /// reject any other pairing when they are built.
    pub fn loss_given(&self, probabilities: &[f64], count: f64) -> LogNormalDist {
        debug_assert_eq!(
            probabilities.len(),
            self.states.len(),
            "loss function '{}' needs one probability per damage state",
            self.id
        );
        LogNormalDist::mixture(
            self.states
                .iter()
                .copied()
                .zip(probabilities.iter().copied()),
        )
        .scale(count)
    }
}

impl fmt::Display for LossFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} damage states", self.id, self.states.len())?;
        for (i, d) in self.states.iter().enumerate() {
            write!(f, "\n  DS{}: mean={}, sd_ln={}", i + 1, d.mean(), d.sd_ln())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs() -> LossFn {
        LossFn::new(
            "COST_1",
            vec![
                LogNormalDist::from_mean_sigma_ln(0.03, 0.4),
                LogNormalDist::zero(),
                LogNormalDist::from_mean_sigma_ln(0.2, 0.3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_expected_loss_is_weighted_mean_times_count() {
        let loss = costs().loss_given(&[0.5, 0.25, 0.25], 4.0);
        let expected = 4.0 * (0.5 * 0.03 + 0.25 * 0.2);
        assert!((loss.mean() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_no_damage_means_no_loss() {
        let loss = costs().loss_given(&[0.0, 0.0, 0.0], 10.0);
        assert_eq!(loss.mean(), 0.0);
        assert_eq!(loss.sd(), 0.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "one probability per damage state")]
    fn test_probability_count_must_match() {
        costs().loss_given(&[0.5, 0.5], 1.0);
    }

    #[test]
    fn test_empty_loss_function_is_rejected() {
        assert!(matches!(
            LossFn::new("EMPTY", Vec::new()),
            Err(SlatError::ShapeMismatch { expected: 1, found: 0, .. })
        ));
    }
}
