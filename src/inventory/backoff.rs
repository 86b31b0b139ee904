// src/inventory/backoff.rs

use rand::Rng;
use std::time::Duration;

use crate::config::ReloadTime;

/// 封顶后抖动带的半宽（毫秒）
const JITTER_HALF_WIDTH_MS: u64 = 5;

/// **失败重试退避策略**
///
/// `raw = base + retry_count * increment`；超过 `max` 时返回 `max - 5 + rand[0, 10)`，
/// 在上限附近打散，避免多个 slot 同时重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub increment_ms: u64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    pub fn new(base_ms: u64, increment_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            increment_ms,
            max_ms,
        }
    }

    pub fn next_delay(&self, retry_count: u32) -> Duration {
        self.next_delay_with(retry_count, &mut rand::thread_rng())
    }

    pub fn next_delay_with<R: Rng + ?Sized>(&self, retry_count: u32, rng: &mut R) -> Duration {
        let raw = self
            .base_ms
            .saturating_add(self.increment_ms.saturating_mul(retry_count as u64));
        if raw > self.max_ms {
            let floor = self.max_ms.saturating_sub(JITTER_HALF_WIDTH_MS);
            let jitter = rng.gen_range(0..JITTER_HALF_WIDTH_MS * 2);
            Duration::from_millis(floor + jitter)
        } else {
            Duration::from_millis(raw)
        }
    }
}

impl From<ReloadTime> for BackoffPolicy {
    fn from(value: ReloadTime) -> Self {
        BackoffPolicy::new(value.base_time, value.add_time, value.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        ReloadTime::default().into()
    }
}
