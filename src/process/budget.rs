/*!
 * Run Budget Tracking
 * Coordinator-local admission counters for the bounded launcher
 */

use crate::config::ConfigError;
use serde::Serialize;

/// Admission counters. Mutated only by the launcher loop.
///
/// Invariants: `active <= cap` while admitting and
/// `launched <= min(total_budget, item_count)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunBudget {
    cap: usize,
    item_count: usize,
    total_budget: usize,
    launched: usize,
    active: usize,
    peak_active: usize,
}

impl RunBudget {
    pub fn new(cap: usize, item_count: usize, total_budget: usize) -> Result<Self, ConfigError> {
        if cap == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        Ok(Self {
            cap,
            item_count,
            total_budget,
            launched: 0,
            active: 0,
            peak_active: 0,
        })
    }

    /// Most workers this run may ever launch
    pub fn limit(&self) -> usize {
        self.total_budget.min(self.item_count)
    }

    /// A slot is free and the launch budget is not spent
    pub fn can_admit(&self) -> bool {
        self.active < self.cap && self.launched < self.limit()
    }

    pub fn is_saturated(&self) -> bool {
        self.active >= self.cap
    }

    pub fn on_launch(&mut self) {
        debug_assert!(self.can_admit(), "launch past budget: {:?}", self);
        self.launched += 1;
        self.active += 1;
        self.peak_active = self.peak_active.max(self.active);
    }

    pub fn on_reap(&mut self) {
        debug_assert!(self.active > 0, "reap without active worker");
        self.active = self.active.saturating_sub(1);
    }

    pub fn launched(&self) -> usize {
        self.launched
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_cap_rejected() {
        assert_eq!(
            RunBudget::new(0, 5, 4).unwrap_err(),
            ConfigError::InvalidConcurrency(0)
        );
    }

    #[test]
    fn test_limit_is_min_of_budget_and_items() {
        assert_eq!(RunBudget::new(2, 5, 4).unwrap().limit(), 4);
        assert_eq!(RunBudget::new(2, 3, 20).unwrap().limit(), 3);
        assert_eq!(RunBudget::new(2, 3, 0).unwrap().limit(), 0);
    }

    #[test]
    fn test_admission_tracks_cap_and_peak() {
        let mut budget = RunBudget::new(2, 5, 4).unwrap();
        budget.on_launch();
        budget.on_launch();
        assert!(budget.is_saturated());
        assert!(!budget.can_admit());

        budget.on_reap();
        assert!(budget.can_admit());
        budget.on_launch();
        budget.on_reap();
        budget.on_launch();

        assert_eq!(budget.launched(), 4);
        assert_eq!(budget.peak_active(), 2);
        assert!(!budget.can_admit());
    }
}
