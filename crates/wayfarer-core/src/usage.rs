use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{Result, WayfarerError};

/// Run-scoped cap on the number of delegated worker calls.
///
/// One meter exists per run. It is handed down by reference to the graph
/// executor and to every nested delegation, so sub-delegate calls count
/// against the same ceiling as the caller's own. The meter is not `Clone`:
/// a copy would be a second, independent budget.
///
/// Reservations are a compare-and-swap on an atomic counter, which keeps
/// concurrent sub-calls from overshooting the limit.
#[derive(Debug)]
pub struct UsageMeter {
    used: AtomicU64,
    limit: u64,
}

impl UsageMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            used: AtomicU64::new(0),
            limit,
        }
    }

    /// Consume `n` units. Fails without consuming anything if the ceiling
    /// would be crossed. Returns the new consumed count.
    pub fn reserve(&self, n: u64) -> Result<u64> {
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            let next = match current.checked_add(n) {
                Some(next) if next <= self.limit => next,
                _ => {
                    return Err(WayfarerError::BudgetExceeded {
                        used: current,
                        requested: n,
                        limit: self.limit,
                    })
                }
            };
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(used = next, limit = self.limit, "Usage reserved");
                    return Ok(next);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Consume a single unit (one delegated call).
    pub fn reserve_one(&self) -> Result<u64> {
        self.reserve(1)
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_until_limit() {
        let meter = UsageMeter::new(3);
        assert_eq!(meter.reserve_one().unwrap(), 1);
        assert_eq!(meter.reserve(2).unwrap(), 3);
        assert_eq!(meter.remaining(), 0);

        let err = meter.reserve_one().unwrap_err();
        assert!(matches!(
            err,
            WayfarerError::BudgetExceeded {
                used: 3,
                requested: 1,
                limit: 3
            }
        ));
        assert_eq!(meter.used(), 3);
    }

    #[test]
    fn test_rejected_reservation_consumes_nothing() {
        let meter = UsageMeter::new(5);
        meter.reserve(4).unwrap();
        assert!(meter.reserve(2).is_err());
        assert_eq!(meter.used(), 4);
        assert_eq!(meter.reserve_one().unwrap(), 5);
    }

    #[test]
    fn test_zero_limit_rejects_first_call() {
        let meter = UsageMeter::new(0);
        assert!(meter.reserve_one().is_err());
        assert_eq!(meter.used(), 0);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let meter = UsageMeter::new(u64::MAX);
        meter.reserve(u64::MAX).unwrap();
        assert!(meter.reserve(1).is_err());
    }

    #[test]
    fn test_concurrent_reservations_never_exceed_limit() {
        let meter = std::sync::Arc::new(UsageMeter::new(50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let meter = meter.clone();
                std::thread::spawn(move || {
                    let mut granted = 0u64;
                    for _ in 0..20 {
                        if meter.reserve_one().is_ok() {
                            granted += 1;
                        }
                        assert!(meter.used() <= meter.limit());
                    }
                    granted
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(meter.used(), 50);
    }
}
