use rand::Rng;
use tracing::warn;
use std::time::Duration;

use crate::config::TranslatorConfig;
use super::Translate;

/// 翻译不可恢复时写入结果的哨兵值
pub const TRANSLATION_FAILED: &str = "[Translation Failed]";

/// 包裹单次翻译调用的重试策略：有界重试 + 指数退避。
/// 预算耗尽或遇到不可重试错误时返回哨兵值，绝不向上抛错，
/// 保证单篇论文失败不会中断整个日报
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_wait: Duration,
    pub max_wait: Option<Duration>,
    pub jitter_ms: u64,
    /// 每次成功后的固定延时，尊重外部速率限制
    pub request_delay: Duration,
    /// 为 true 时所有错误类别一律重试
    pub retry_all_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_wait: Duration::from_secs(1),
            max_wait: None,
            jitter_ms: 0,
            request_delay: Duration::ZERO,
            retry_all_errors: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            base_wait: Duration::from_secs_f64(config.base_wait_seconds),
            max_wait: config.max_wait_seconds.map(Duration::from_secs_f64),
            jitter_ms: config.jitter_ms,
            request_delay: Duration::from_millis(config.request_delay_ms),
            retry_all_errors: config.retry_all_errors,
        }
    }

    /// 执行一个翻译单元。成功返回译文，失败返回哨兵值
    pub async fn run<T: Translate + ?Sized>(&self, translator: &T, text: &str) -> String {
        let mut wait = self.base_wait;

        for attempt in 1..=self.max_retries {
            match translator.translate(text).await {
                Ok(translated) => {
                    if !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                    return translated;
                }
                Err(e) if e.is_rate_limited() || self.retry_all_errors => {
                    warn!(
                        "翻译请求失败，稍后重试 (第 {}/{} 次): {}",
                        attempt, self.max_retries, e
                    );
                    tokio::time::sleep(self.next_pause(wait)).await;
                    wait = self.double_capped(wait);
                }
                Err(e) => {
                    warn!("翻译失败，错误不可重试: {}", e);
                    return TRANSLATION_FAILED.to_string();
                }
            }
        }

        warn!("重试 {} 次后翻译仍然失败", self.max_retries);
        TRANSLATION_FAILED.to_string()
    }

    fn next_pause(&self, wait: Duration) -> Duration {
        if self.jitter_ms == 0 {
            return wait;
        }
        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        wait + Duration::from_millis(jitter)
    }

    fn double_capped(&self, wait: Duration) -> Duration {
        let doubled = wait.saturating_mul(2);
        match self.max_wait {
            Some(cap) => doubled.min(cap),
            None => doubled,
        }
    }
}
