//! Reconnect backoff: a [`BackoffStrategy`] is cloned into an iterator that
//! yields the wait duration for each attempt, up to an optional cap.

use std::time::Duration;

/// One reconnect attempt's wait duration and position, as handed to the
/// metadata/reconnect glue's logging calls.
#[derive(Debug, Clone, Copy)]
pub struct NextAttempt {
    pub duration: Duration,
    pub attempt_num: usize,
    pub max_attempts: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Constant(Duration),
    Exponential { base: Duration, max: Duration },
}

/// Configurable reconnect cadence for a producer or consumer.
#[derive(Debug, Clone, Copy)]
pub struct BackoffStrategy {
    kind: Kind,
    max_attempts: Option<usize>,
}

impl BackoffStrategy {
    pub fn constant(interval: Duration) -> Self {
        Self {
            kind: Kind::Constant(interval),
            max_attempts: None,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            kind: Kind::Exponential { base, max },
            max_attempts: None,
        }
    }

    /// `0` means unlimited attempts.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = if max_attempts == 0 {
            None
        } else {
            Some(max_attempts)
        };
        self
    }

    pub fn iter(&self) -> BackoffStrategyIter {
        BackoffStrategyIter {
            strategy: *self,
            attempt: 0,
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::constant(Duration::from_millis(500)).with_max_attempts(5)
    }
}

impl IntoIterator for BackoffStrategy {
    type Item = NextAttempt;
    type IntoIter = BackoffStrategyIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BackoffStrategyIter {
    strategy: BackoffStrategy,
    attempt: usize,
}

impl Iterator for BackoffStrategyIter {
    type Item = NextAttempt;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(max) = self.strategy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }

        self.attempt += 1;

        let duration = match self.strategy.kind {
            Kind::Constant(interval) => interval,
            Kind::Exponential { base, max } => {
                let scaled = base.saturating_mul(1 << (self.attempt - 1).min(20));
                scaled.min(max)
            }
        };

        Some(NextAttempt {
            duration,
            attempt_num: self.attempt,
            max_attempts: self.strategy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_is_capped_by_max_attempts() {
        let strategy = BackoffStrategy::constant(Duration::from_millis(10)).with_max_attempts(3);
        let attempts: Vec<_> = strategy.iter().collect();
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|a| a.duration == Duration::from_millis(10)));
    }

    #[test]
    fn zero_max_attempts_means_unlimited() {
        let strategy = BackoffStrategy::constant(Duration::from_millis(1)).with_max_attempts(0);
        assert_eq!(strategy.iter().take(50).count(), 50);
    }

    #[test]
    fn exponential_backoff_grows_and_caps() {
        let strategy = BackoffStrategy::exponential(Duration::from_millis(10), Duration::from_millis(100))
            .with_max_attempts(10);
        let attempts: Vec<_> = strategy.iter().map(|a| a.duration).collect();
        assert_eq!(attempts[0], Duration::from_millis(10));
        assert_eq!(attempts[1], Duration::from_millis(20));
        assert!(attempts.iter().all(|d| *d <= Duration::from_millis(100)));
    }
}
