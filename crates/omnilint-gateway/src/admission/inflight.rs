//! Global inflight cap.
//!
//! `try_begin` hands out an [`InflightPermit`]; dropping the permit is the
//! only way to release a slot, so every exit path (early return, `?`,
//! panic unwind, task cancellation) releases exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct InflightGovernor {
    current: AtomicUsize,
    max: usize,
}

impl InflightGovernor {
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            max,
        })
    }

    /// Take a slot if one is free. Never mutates the counter when full.
    pub fn try_begin(self: &Arc<Self>) -> Option<InflightPermit> {
        self.begin().then(|| InflightPermit {
            governor: Arc::clone(self),
        })
    }

    fn begin(&self) -> bool {
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur < self.max).then_some(cur + 1)
            })
            .is_ok()
    }

    fn end(&self) {
        let _ = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some(cur.saturating_sub(1))
            });
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_saturated(&self) -> bool {
        self.current() >= self.max
    }
}

/// One admitted request. Releases its slot on drop.
#[derive(Debug)]
pub struct InflightPermit {
    governor: Arc<InflightGovernor>,
}

impl Drop for InflightPermit {
    fn drop(&mut self) {
        self.governor.end();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn full_governor_rejects_without_mutation() {
        let g = InflightGovernor::new(2);
        let a = g.try_begin();
        let b = g.try_begin();
        assert!(a.is_some() && b.is_some());
        assert!(g.try_begin().is_none());
        assert_eq!(g.current(), 2);
        assert!(g.is_saturated());

        drop(a);
        assert_eq!(g.current(), 1);
        assert!(g.try_begin().is_some());
        drop(b);
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn end_is_floored_at_zero() {
        let g = InflightGovernor::new(1);
        g.end();
        assert_eq!(g.current(), 0);
    }

    #[test]
    fn permit_released_when_holder_panics() {
        let g = InflightGovernor::new(1);
        let g2 = Arc::clone(&g);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _permit = g2.try_begin();
            panic!("boom");
        }));
        assert!(res.is_err());
        assert_eq!(g.current(), 0);
    }

    #[tokio::test]
    async fn concurrent_tasks_never_exceed_max() {
        let g = InflightGovernor::new(3);
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for i in 0..32u64 {
            let g = Arc::clone(&g);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let Some(_permit) = g.try_begin() else {
                    return false;
                };
                peak.fetch_max(g.current(), Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(5)).await;
                if i % 4 == 0 {
                    // failing requests still release
                    return false;
                }
                true
            }));
        }
        for h in handles {
            let _ = h.await;
        }

        assert!(peak.load(Ordering::Relaxed) <= 3);
        assert_eq!(g.current(), 0);
    }
}
