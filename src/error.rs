// src/error.rs

use thiserror::Error;

/// 配置读取 / 解析失败
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// 上游广告网络返回的失败原因（不透明，只在编排器内部流转）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no fill")]
    NoFill,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream timeout after {0}ms")]
    Timeout(u64),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LoadError::Timeout(0)
        } else if err.is_decode() {
            LoadError::InvalidResponse(err.to_string())
        } else {
            LoadError::Network(err.to_string())
        }
    }
}
