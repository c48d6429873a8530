//! 指数退避重试：最多 `max_attempts` 次，延迟从 `base_delay` 开始每次乘以 `multiplier`

use log::{info, warn};
use serde_json::Value;
use std::time::Duration;

use super::error::RemoteCallError;
use super::payload::GenerateRequest;
use super::transport::InferenceTransport;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 `failed_attempt` 次（从 1 开始）失败后的等待时间
    /// 溢出或非有限值时取 `Duration::MAX`
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// 全部失败时累计的等待时间（最后一次失败后不再等待）
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|n| self.delay_after(n))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// 带重试的远程调用器，本身无状态，可并发使用
pub struct ResilientCaller<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: InferenceTransport> ResilientCaller<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn call(&self, request: &GenerateRequest) -> Result<Value, RemoteCallError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.send(request).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("✅ Remote call succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!("❌ Remote call failed after {} attempts: {}", attempt, e);
                    return Err(RemoteCallError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        "🔁 Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
