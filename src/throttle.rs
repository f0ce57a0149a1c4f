use std::time::Duration;

/// Cached value that is recomputed at most once per `interval`.
///
/// Timestamps come from the caller, so the same wrapper serves a wall clock
/// and a simulated playback position.
#[derive(Clone, Debug)]
pub struct Throttled<T> {
    interval: Duration,
    last: Option<(Duration, T)>,
}

impl<T> Throttled<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Recompute at most `rate_hz` times per second. A non-positive rate
    /// recomputes on every call.
    pub fn from_rate_hz(rate_hz: f64) -> Self {
        let interval = if rate_hz > 0.0 && rate_hz.is_finite() {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Return the cached value, recomputing first when it is missing or stale.
    /// The flag is true when `compute` ran.
    pub fn get_or_update(&mut self, now: Duration, compute: impl FnOnce() -> T) -> (&T, bool) {
        let stale = match &self.last {
            None => true,
            Some((at, _)) => now.saturating_sub(*at) >= self.interval || now < *at,
        };
        if stale {
            self.last = None;
        }
        let (_, value) = self.last.get_or_insert_with(|| (now, compute()));
        (&*value, stale)
    }

    pub fn get(&self) -> Option<&T> {
        self.last.as_ref().map(|(_, v)| v)
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_only_after_interval() {
        let mut cache = Throttled::from_rate_hz(10.0);
        let mut calls = 0;
        let mut tick = |ms: u64, cache: &mut Throttled<u64>| {
            let (v, fresh) = cache.get_or_update(Duration::from_millis(ms), || {
                calls += 1;
                ms
            });
            (*v, fresh)
        };

        assert_eq!(tick(0, &mut cache), (0, true));
        assert_eq!(tick(50, &mut cache), (0, false));
        assert_eq!(tick(99, &mut cache), (0, false));
        assert_eq!(tick(100, &mut cache), (100, true));
        assert_eq!(tick(150, &mut cache), (100, false));
        drop(tick);
        assert_eq!(calls, 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let mut cache = Throttled::new(Duration::from_secs(60));
        cache.get_or_update(Duration::ZERO, || 1);
        cache.invalidate();
        assert!(cache.get().is_none());
        let (v, fresh) = cache.get_or_update(Duration::from_secs(1), || 2);
        assert_eq!((*v, fresh), (2, true));
    }

    #[test]
    fn zero_rate_never_caches() {
        let mut cache = Throttled::from_rate_hz(0.0);
        assert_eq!(cache.interval(), Duration::ZERO);
        cache.get_or_update(Duration::ZERO, || 1);
        let (_, fresh) = cache.get_or_update(Duration::ZERO, || 2);
        assert!(fresh);
    }

    #[test]
    fn clock_going_backwards_recomputes() {
        let mut cache = Throttled::from_rate_hz(1.0);
        cache.get_or_update(Duration::from_secs(10), || 1);
        let (v, fresh) = cache.get_or_update(Duration::from_secs(2), || 2);
        assert_eq!((*v, fresh), (2, true));
    }
}
