use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Token-bucket gate on outbound requests. The bucket starts full and
/// refills proportionally to elapsed time, up to capacity.
///
/// `acquire` holds the lock only for the accounting; waiting for the next
/// token happens outside it, so a starved waiter never blocks refill
/// arithmetic for others. Dropping the `acquire` future while waiting
/// consumes nothing.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until a token is available, then consume one.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1 {
                    state.tokens -= 1;
                    return;
                }
                self.time_to_next_token(&state)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available, after refill accounting.
    pub async fn available(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill(&self, state: &mut BucketState) {
        let elapsed_ms = state.last_refill.elapsed().as_millis();
        let window_ms = self.window.as_millis().max(1);
        let refilled = (elapsed_ms * self.capacity as u128 / window_ms) as u32;
        if refilled == 0 {
            return;
        }
        if state.tokens.saturating_add(refilled) >= self.capacity {
            state.tokens = self.capacity;
            state.last_refill = Instant::now();
        } else {
            state.tokens += refilled;
            // Advance by the time-equivalent of the refilled tokens so the
            // fractional remainder keeps accruing.
            let per_token_ms = window_ms / self.capacity as u128;
            state.last_refill += Duration::from_millis((refilled as u128 * per_token_ms) as u64);
        }
    }

    fn time_to_next_token(&self, state: &BucketState) -> Duration {
        let per_token = Duration::from_millis(
            (self.window.as_millis().max(1) / self.capacity as u128) as u64,
        )
        .max(Duration::from_millis(1));
        let elapsed = state.last_refill.elapsed();
        if elapsed >= per_token {
            Duration::from_millis(1)
        } else {
            per_token - elapsed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(limiter.available().await, 0);
    }

    #[tokio::test]
    async fn starved_acquire_waits_for_refill() {
        let limiter = RateLimiter::new(2, Duration::from_millis(200));
        limiter.acquire().await;
        limiter.acquire().await;
        let started = Instant::now();
        limiter.acquire().await;
        // One token accrues every window/capacity = 100ms.
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn completed_acquires_stay_within_the_window_bound() {
        let capacity = 4u32;
        let window = Duration::from_millis(400);
        let limiter = RateLimiter::new(capacity, window);
        let started = Instant::now();
        let mut completed = 0u32;
        while started.elapsed() < window {
            limiter.acquire().await;
            completed += 1;
        }
        let elapsed = started.elapsed();
        let refill_allowance =
            (elapsed.as_millis() * capacity as u128 / window.as_millis()) as u32;
        assert!(completed <= capacity + refill_allowance + 1);
    }

    #[tokio::test]
    async fn refill_never_exceeds_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_millis(50));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(limiter.available().await, 3);
    }
}
