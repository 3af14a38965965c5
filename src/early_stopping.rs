//! Patience-based early stopping shared by the backprop and evolution loops.

use crate::{Error, Network, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Stop once validation accuracy fails to improve by more than `threshold` for
/// `patience` consecutive rounds. A `patience` of zero disables it.
pub struct EarlyStopping {
    pub patience: usize,
    pub threshold: f64,
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self {
            patience: 0,
            threshold: 0.001,
        }
    }
}

impl EarlyStopping {
    pub fn new(patience: usize, threshold: f64) -> Self {
        Self {
            patience,
            threshold,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.patience > 0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidParam(format!(
                "early stopping threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Running state of one early-stopping session.
///
/// The best score starts at `-1.0`, below any accuracy, so the first observation
/// always counts as an improvement.
#[derive(Debug, Clone)]
pub struct EarlyStoppingTracker {
    config: EarlyStopping,
    best: f64,
    rounds_without_improvement: usize,
    snapshot: Option<Network>,
}

impl EarlyStoppingTracker {
    pub fn new(config: EarlyStopping) -> Self {
        Self {
            config,
            best: -1.0,
            rounds_without_improvement: 0,
            snapshot: None,
        }
    }

    /// Record one validation score for `candidate`. Returns `true` once training
    /// should stop.
    ///
    /// An improvement resets the counter and replaces the snapshot with a clone of
    /// `candidate`.
    pub fn observe(&mut self, score: f64, candidate: &Network) -> bool {
        if score > self.best + self.config.threshold {
            self.best = score;
            self.rounds_without_improvement = 0;
            self.snapshot = Some(candidate.clone());
        } else {
            self.rounds_without_improvement += 1;
        }
        self.rounds_without_improvement >= self.config.patience
    }

    #[inline]
    pub fn best_score(&self) -> f64 {
        self.best
    }

    #[inline]
    pub fn rounds_without_improvement(&self) -> usize {
        self.rounds_without_improvement
    }

    #[inline]
    pub fn snapshot(&self) -> Option<&Network> {
        self.snapshot.as_ref()
    }

    pub fn into_snapshot(self) -> Option<Network> {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Activation;

    fn net(seed: u64) -> Network {
        Network::new_with_seed(&[2, 2], Activation::ReLU, Activation::Sigmoid, seed).unwrap()
    }

    #[test]
    fn stops_after_patience_rounds_without_improvement() {
        let mut tracker = EarlyStoppingTracker::new(EarlyStopping::new(2, 0.01));

        assert!(!tracker.observe(0.5, &net(0)));
        assert!(!tracker.observe(0.505, &net(1)));
        assert!(tracker.observe(0.5, &net(2)));
        assert_eq!(tracker.rounds_without_improvement(), 2);

        // Snapshot is the network from the last real improvement.
        let snap = tracker.into_snapshot().unwrap();
        assert!(snap.params().eq(net(0).params()));
    }

    #[test]
    fn improvement_resets_counter() {
        let mut tracker = EarlyStoppingTracker::new(EarlyStopping::new(2, 0.0));
        assert!(!tracker.observe(0.1, &net(0)));
        assert!(!tracker.observe(0.1, &net(1)));
        assert!(!tracker.observe(0.2, &net(2)));
        assert_eq!(tracker.rounds_without_improvement(), 0);
        assert!((tracker.best_score() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_score_is_an_improvement_over_the_initial_best() {
        let mut tracker = EarlyStoppingTracker::new(EarlyStopping::new(1, 0.001));
        assert!(!tracker.observe(0.0, &net(0)));
        assert!(tracker.snapshot().is_some());
        assert!(tracker.observe(0.0, &net(1)));
    }

    #[test]
    fn defaults_disable_early_stopping() {
        let cfg = EarlyStopping::default();
        assert!(!cfg.is_enabled());
        assert!((cfg.threshold - 0.001).abs() < 1e-12);
        assert!(EarlyStopping::new(1, f64::NAN).validate().is_err());
    }
}
