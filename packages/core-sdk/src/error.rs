use std::time::Duration;

use thiserror::Error;

/**
 * \brief Provider 调用失败的分类。
 * \details 网关边界会吞掉所有变体并替换为固定回退值，这里的区分只用于日志与测试。
 */
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider credential is not configured")]
    MissingCredential,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("empty response: {0}")]
    EmptyResponse(&'static str),
}

impl GatewayError {
    /** \brief 日志用的短标签。 */
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => "missing-credential",
            GatewayError::Transport(_) => "transport",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::MalformedResponse(_) => "malformed",
            GatewayError::EmptyResponse(_) => "empty",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::MalformedResponse(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::MalformedResponse(e.to_string())
    }
}
