use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::auth::Credential;
use crate::error::ApiError;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-credential fixed-window state. Replaced as one unit on rollover so
/// the reset can never race a concurrent increment.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

/// Fixed-window request admission: at most `ceiling` admitted requests per
/// credential per 60-second window. Buckets are created lazily on first
/// sight of a credential and live for the process lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: u32,
    window: Duration,
    buckets: Mutex<HashMap<Credential, RateWindow>>,
}

impl RateLimiter {
    pub fn new(ceiling: u32) -> Self {
        Self::with_window(ceiling, WINDOW)
    }

    /// Custom window length, for tests that must observe a rollover.
    pub fn with_window(ceiling: u32, window: Duration) -> Self {
        Self {
            ceiling,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request. The increment-and-compare runs under the
    /// bucket lock; the check is CPU-bound and never blocks on I/O.
    pub fn admit(&self, credential: &Credential) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let bucket = buckets.entry(credential.clone()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });

        let elapsed = now.duration_since(bucket.window_start);
        if elapsed >= self.window {
            *bucket = RateWindow {
                window_start: now,
                count: 0,
            };
        }

        if bucket.count >= self.ceiling {
            let remaining = self.window.saturating_sub(now.duration_since(bucket.window_start));
            return Err(ApiError::RateLimited {
                retry_after: seconds_ceil(remaining),
            });
        }

        bucket.count += 1;
        Ok(())
    }
}

fn seconds_ceil(duration: Duration) -> u64 {
    let mut seconds = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(token: &str) -> Credential {
        Credential::new(token)
    }

    #[test]
    fn admits_up_to_the_ceiling_then_rejects() {
        let limiter = RateLimiter::new(3);
        let key = credential("alpha-0123456789");

        for _ in 0..3 {
            limiter.admit(&key).unwrap();
        }
        let err = limiter.admit(&key).unwrap_err();
        let retry_after = err.retry_after().unwrap();
        assert!((1..=60).contains(&retry_after), "{retry_after}");
    }

    #[test]
    fn windows_are_independent_per_credential() {
        let limiter = RateLimiter::new(1);
        limiter.admit(&credential("alpha-0123456789")).unwrap();
        limiter.admit(&credential("beta-0123456789")).unwrap();
        assert!(limiter.admit(&credential("alpha-0123456789")).is_err());
    }

    #[test]
    fn counter_resets_when_the_window_elapses() {
        let limiter = RateLimiter::with_window(2, Duration::from_millis(40));
        let key = credential("alpha-0123456789");

        limiter.admit(&key).unwrap();
        limiter.admit(&key).unwrap();
        assert!(limiter.admit(&key).is_err());

        std::thread::sleep(Duration::from_millis(60));
        limiter.admit(&key).unwrap();
    }

    #[test]
    fn zero_ceiling_rejects_everything() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.admit(&credential("alpha-0123456789")).is_err());
    }

    #[test]
    fn concurrent_admissions_never_exceed_the_ceiling() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let limiter = Arc::new(RateLimiter::new(50));
        let admitted = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = limiter.clone();
            let admitted = admitted.clone();
            handles.push(std::thread::spawn(move || {
                let key = credential("shared-0123456789");
                for _ in 0..20 {
                    if limiter.admit(&key).is_ok() {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 50);
    }
}
