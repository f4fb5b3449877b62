// budget.rs - Dual Stop-Budget Tracking
// Purpose: Decide when an attack run must stop, combining an attempt-count
//          limit and a wall-clock limit under a configurable policy

use std::time::Duration;

/// How the two limits combine into a stop decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetMode {
    /// Stop the instant either set limit is hit.
    FirstLimit,
    /// Run until every set limit is exhausted; while only one is exhausted the
    /// candidate loop keeps advancing without issuing network attempts.
    WorstOf,
}

#[derive(Debug, Clone)]
pub struct Budget {
    pub max_attempts: Option<u64>,
    pub max_time: Option<Duration>,
    pub mode: BudgetMode,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self { max_attempts: None, max_time: None, mode: BudgetMode::FirstLimit }
    }

    fn is_unlimited(&self) -> bool {
        self.max_attempts.is_none() && self.max_time.is_none()
    }
}

/// Tracks limit exhaustion across a run. The exhaustion flags are monotonic:
/// once set they stay set, even if a caller later passes a smaller elapsed
/// value. The tracker never reads the clock itself; callers pass attempts and
/// elapsed time in, which keeps tests deterministic.
pub struct BudgetTracker {
    budget: Budget,
    attempts_exhausted: bool,
    time_exhausted: bool,
}

impl BudgetTracker {
    pub fn new(budget: Budget) -> Self {
        Self { budget, attempts_exhausted: false, time_exhausted: false }
    }

    fn poll(&mut self, attempts_made: u64, elapsed: Duration) {
        if let Some(max) = self.budget.max_attempts {
            if attempts_made >= max {
                self.attempts_exhausted = true;
            }
        }
        if let Some(max) = self.budget.max_time {
            if elapsed >= max {
                self.time_exhausted = true;
            }
        }
    }

    /// Must the run terminate now? An unset limit counts as already satisfied
    /// when combining under WorstOf, but a budget with no limits at all never
    /// stops.
    pub fn should_stop(&mut self, attempts_made: u64, elapsed: Duration) -> bool {
        self.poll(attempts_made, elapsed);
        if self.budget.is_unlimited() {
            return false;
        }
        match self.budget.mode {
            BudgetMode::FirstLimit => self.attempts_exhausted || self.time_exhausted,
            BudgetMode::WorstOf => {
                (self.budget.max_attempts.is_none() || self.attempts_exhausted)
                    && (self.budget.max_time.is_none() || self.time_exhausted)
            }
        }
    }

    /// WorstOf only: true when at least one set limit is exhausted but the run
    /// must keep going for the other. The caller advances candidates without
    /// issuing requests while this holds.
    pub fn skip_attempt(&mut self, attempts_made: u64, elapsed: Duration) -> bool {
        if self.budget.mode != BudgetMode::WorstOf {
            return false;
        }
        let stop = self.should_stop(attempts_made, elapsed);
        (self.attempts_exhausted || self.time_exhausted) && !stop
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts_exhausted
    }

    pub fn time_exhausted(&self) -> bool {
        self.time_exhausted
    }

    /// Human-readable description of which limits tripped, for run logs.
    pub fn exhausted_limits(&self) -> &'static str {
        match (self.attempts_exhausted, self.time_exhausted) {
            (true, true) => "attempt and time limits",
            (true, false) => "attempt limit",
            (false, true) => "time limit",
            (false, false) => "no limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_unlimited_budget_never_stops() {
        let mut tracker = BudgetTracker::new(Budget::unlimited());
        assert!(!tracker.should_stop(0, secs(0)));
        assert!(!tracker.should_stop(1_000_000, secs(86_400)));
        assert!(!tracker.skip_attempt(1_000_000, secs(86_400)));

        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: None,
            max_time: None,
            mode: BudgetMode::WorstOf,
        });
        assert!(!tracker.should_stop(1_000_000, secs(86_400)));
    }

    #[test]
    fn test_first_limit_stops_on_attempts() {
        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: Some(3),
            max_time: Some(secs(1000)),
            mode: BudgetMode::FirstLimit,
        });
        assert!(!tracker.should_stop(2, secs(1)));
        assert!(tracker.should_stop(3, secs(1)));
        assert!(!tracker.skip_attempt(3, secs(1)));
    }

    #[test]
    fn test_first_limit_stops_on_time() {
        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: Some(1000),
            max_time: Some(secs(5)),
            mode: BudgetMode::FirstLimit,
        });
        assert!(!tracker.should_stop(1, secs(4)));
        assert!(tracker.should_stop(1, secs(5)));
    }

    #[test]
    fn test_worst_of_requires_both_limits() {
        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: Some(3),
            max_time: Some(secs(1000)),
            mode: BudgetMode::WorstOf,
        });
        // Attempts exhausted, time not: keep running but skip real attempts.
        assert!(!tracker.should_stop(3, secs(1)));
        assert!(tracker.attempts_exhausted());
        assert!(!tracker.time_exhausted());
        assert!(tracker.skip_attempt(4, secs(2)));
        // Both exhausted: stop, and skip_attempt no longer applies.
        assert!(tracker.should_stop(4, secs(1000)));
        assert!(!tracker.skip_attempt(4, secs(1000)));
    }

    #[test]
    fn test_worst_of_unset_limit_counts_as_satisfied() {
        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: Some(2),
            max_time: None,
            mode: BudgetMode::WorstOf,
        });
        assert!(!tracker.should_stop(1, secs(0)));
        assert!(tracker.should_stop(2, secs(0)));
    }

    #[test]
    fn test_exhaustion_flags_are_monotonic() {
        let mut tracker = BudgetTracker::new(Budget {
            max_attempts: Some(10),
            max_time: Some(secs(5)),
            mode: BudgetMode::WorstOf,
        });
        assert!(!tracker.should_stop(1, secs(6)));
        assert!(tracker.time_exhausted());
        // A smaller elapsed value later must not clear the flag.
        assert!(!tracker.should_stop(1, secs(0)));
        assert!(tracker.time_exhausted());
        assert!(tracker.should_stop(10, secs(0)));
    }
}
