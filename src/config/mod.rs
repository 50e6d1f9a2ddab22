use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::Result;

use crate::translator::BatchStrategy;

/// 配置文件默认路径
pub const CONFIG_PATH: &str = "config/settings.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub translator: TranslatorConfig,
    pub digest: DigestConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub keywords: Vec<String>,
    pub max_results: usize,
    pub days_back: u32,
    pub request_delay_ms: u64,
    pub user_agent: String,
    pub arxiv_enabled: bool,
    pub aps_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub target_language: String,
    pub max_retries: u32,
    pub base_wait_seconds: f64,
    /// 单次退避等待上限，不设则不封顶
    pub max_wait_seconds: Option<f64>,
    pub jitter_ms: u64,
    /// 每次成功调用后的固定延时，防止触发速率限制
    pub request_delay_ms: u64,
    /// 为 true 时所有错误类别都重试，默认只重试限流类
    pub retry_all_errors: bool,
    pub batch_strategy: BatchStrategy,
    pub concurrency: usize,
    pub request_timeout_seconds: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestConfig {
    pub output_dir: String,
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let mut config = Self::default();
            config.translator.apply_env_fallback();
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.translator.apply_env_fallback();
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl TranslatorConfig {
    /// API key 未写入配置文件时回退到环境变量
    fn apply_env_fallback(&mut self) {
        if self.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = key;
            }
        }
    }

    /// 检查 API key 是否已配置
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != "your-api-key"
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["quantum".to_string()],
            max_results: 20,
            days_back: 3,
            request_delay_ms: 1000,
            user_agent: "arxiv-digest/0.1 (academic research; mailto:user@example.com)".to_string(),
            arxiv_enabled: true,
            aps_enabled: true,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4.1-mini".to_string(),
            target_language: "中文".to_string(),
            max_retries: 5,
            base_wait_seconds: 1.0,
            max_wait_seconds: None,
            jitter_ms: 0,
            request_delay_ms: 0,
            retry_all_errors: false,
            batch_strategy: BatchStrategy::PerField,
            concurrency: 1,
            request_timeout_seconds: 30.0,
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            output_dir: "data/reports".to_string(),
            subject_prefix: "arXiv Daily Digest — 中文翻译版".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        // 每天早上9点
        Self {
            cron: "0 0 9 * * *".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.translator.max_retries, 5);
        assert_eq!(parsed.translator.batch_strategy, BatchStrategy::PerField);
        assert_eq!(parsed.fetcher.days_back, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let text = r#"
[translator]
api_key = "sk-test"
batch_strategy = "whole_batch"
"#;
        let config: AppConfig = toml::from_str(text).unwrap();

        assert_eq!(config.translator.api_key, "sk-test");
        assert_eq!(config.translator.batch_strategy, BatchStrategy::WholeBatch);
        // 未给出的字段回落到默认值
        assert_eq!(config.translator.max_retries, 5);
        assert_eq!(config.translator.concurrency, 1);
        assert!(config.translator.max_wait_seconds.is_none());
        assert_eq!(config.fetcher.max_results, 20);
    }

    #[test]
    fn test_is_configured() {
        let mut tc = TranslatorConfig::default();
        assert!(!tc.is_configured());
        tc.api_key = "sk-abc".to_string();
        assert!(tc.is_configured());
    }
}
