pub mod batch;
pub mod error;
pub mod pipeline;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslatorConfig;

pub use batch::{BatchStrategy, TranslatedPaper, TranslationResult, TranslationUnit, UnitKind, UnitStatus};
pub use error::TranslateError;
pub use pipeline::TranslationPipeline;
pub use retry::{RetryPolicy, TRANSLATION_FAILED};

/// 翻译后端。一次调用对应一次远程请求，不自带重试
#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

/// Chat Completion API 请求体
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat Completion API 响应体
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// 基于 OpenAI 兼容接口的学术翻译器
pub struct LlmTranslator {
    client: reqwest::Client,
    config: TranslatorConfig,
}

impl LlmTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs_f64(config.request_timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// 检查 API key 是否已配置
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn system_prompt(&self) -> String {
        format!(
            "你是一位专业的学术翻译专家。请将用户提供的英文学术文本翻译为{lang}。\n\
             翻译要求：\n\
             1. 保留专业术语，不得简化\n\
             2. 不要意译，不要总结\n\
             3. 保持原文结构，包括 [标题翻译]、[摘要翻译]、<<PAPER_n>> 等标记行原样保留\n\
             4. 使用正式的学术书面语，只输出翻译结果",
            lang = self.config.target_language
        )
    }

    async fn call_api(&self, text: &str) -> Result<String, TranslateError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(TranslateError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::from_status(status.as_u16(), body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| TranslateError::Malformed("响应缺少 choices".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Translate for LlmTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        // 空文本直接返回，不消耗额度
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        self.call_api(text).await
    }
}
