use rand::Rng;
use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_JITTER_MS: RangeInclusive<u64> = 100..=400;

/// 單一上游方法的節流器：兩次呼叫之間至少間隔 `min_interval`，
/// 需要等待時再加上隨機抖動。同一方法的呼叫會依序執行。
pub struct RateLimiter {
    name: &'static str,
    min_interval: Duration,
    jitter_ms: RangeInclusive<u64>,
    last_called: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, min_interval: Duration) -> Self {
        Self {
            name,
            min_interval,
            jitter_ms: DEFAULT_JITTER_MS,
            last_called: Mutex::new(None),
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter_ms = 0..=0;
        self
    }

    pub async fn throttle<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        if self.min_interval.is_zero() {
            return call.await;
        }

        let mut last_called = self.last_called.lock().await;

        if let Some(previous) = *last_called {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed + self.jitter();
                tracing::debug!("⏳ Throttling {} for {:?}", self.name, wait);
                tokio::time::sleep(wait).await;
            }
        }

        let result = call.await;
        *last_called = Some(Instant::now());
        result
    }

    fn jitter(&self) -> Duration {
        let (start, end) = (*self.jitter_ms.start(), *self.jitter_ms.end());
        if end == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(start..=end))
    }
}
