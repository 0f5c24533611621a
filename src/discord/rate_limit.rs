use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Upper bound for a single sleep, so absurdly low rates still wake up.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Token bucket shared by every outbound REST call.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    /// Rates below one request per second still hold a full token, otherwise
    /// the bucket could never reach the amount a request costs.
    pub fn new(requests_per_second: f64) -> Self {
        let max_tokens = requests_per_second.max(1.0);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate: requests_per_second,
        }
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.max_tokens);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                (1.0 - bucket.tokens) / self.refill_rate
            };

            let wait = if wait.is_finite() {
                Duration::from_secs_f64(wait.clamp(0.001, MAX_WAIT.as_secs_f64()))
            } else {
                MAX_WAIT
            };
            tokio::time::sleep(wait).await;
        }
    }
}
