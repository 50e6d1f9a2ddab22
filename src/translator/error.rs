use thiserror::Error;

/// 翻译远程调用的错误分类
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("触发速率限制: {0}")]
    RateLimited(String),

    #[error("请求超时")]
    Timeout,

    #[error("网络请求错误: {0}")]
    Network(String),

    #[error("翻译API返回错误 [{status}]: {body}")]
    Api { status: u16, body: String },

    #[error("API响应格式异常: {0}")]
    Malformed(String),
}

impl TranslateError {
    /// 是否属于限流类错误。超时按限流类处理（可重试），
    /// 其余类别默认直接失败
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TranslateError::RateLimited(_) | TranslateError::Timeout)
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Network(e.to_string())
        }
    }

    /// 根据HTTP状态码与响应体内容归类失败响应
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        let lowered = body.to_lowercase();
        if status == 429
            || lowered.contains("rate limit")
            || lowered.contains("rate exceeded")
            || lowered.contains("too many requests")
        {
            TranslateError::RateLimited(format!("{}: {}", status, body))
        } else {
            TranslateError::Api { status, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        let err = TranslateError::from_status(429, "slow down".to_string());
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_body_marker_is_rate_limited() {
        let err = TranslateError::from_status(503, "Rate exceeded, retry later".to_string());
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_auth_failure_is_fatal() {
        let err = TranslateError::from_status(401, "invalid api key".to_string());
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert!(TranslateError::Timeout.is_rate_limited());
    }
}
