use std::time::Duration;

/// Minimum delay between reconnect attempts (seconds).
const BACKOFF_BASE_SECS: u64 = 5;
/// Maximum delay between reconnect attempts (seconds).
const BACKOFF_MAX_SECS: u64 = 300; // 5 minutes
/// Jitter fraction applied to each delay (+0 … 10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Exponential reconnect schedule: 5 s → 10 s → 20 s → … → 300 s (cap).
///
/// Unlike a bounded retry budget this never gives up; the bridge keeps
/// running on the Discord side while IRC is unreachable.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Delay before the next attempt, without jitter.
    pub fn base_delay(&self) -> Duration {
        let secs = BACKOFF_BASE_SECS
            .saturating_mul(1u64 << self.attempt.min(16))
            .min(BACKOFF_MAX_SECS);
        Duration::from_secs(secs)
    }

    /// Delay before the next attempt with jitter applied; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay();
        self.attempt = self.attempt.saturating_add(1);
        base + Duration::from_secs(jitter_secs(base.as_secs()))
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Call after a connection registered successfully.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Return a jitter offset (0 … `JITTER_FRACTION * base_secs`) as integer seconds.
///
/// Uses a simple pseudo-random value derived from the current
/// timestamp, avoiding a rand dependency.
fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_cap() {
        let mut b = Backoff::new();
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(b.base_delay().as_secs());
            b.next_delay();
        }
        assert_eq!(seen, vec![5, 10, 20, 40, 80, 160, 300, 300]);
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let mut b = Backoff::new();
        for _ in 0..10 {
            let base = b.base_delay();
            let delay = b.next_delay();
            assert!(delay >= base);
            assert!(delay <= base + base / 10);
        }
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut b = Backoff::new();
        b.next_delay();
        b.next_delay();
        assert_eq!(b.attempts(), 2);
        b.reset();
        assert_eq!(b.base_delay(), Duration::from_secs(BACKOFF_BASE_SECS));
    }
}
