//! SDK 错误类型
//!
//! 只有两类错误：请求错误（网络、HTTP、反序列化、认证服务）和参数校验错误。
//! 请求错误在 hook 边界被捕获并写入对应实体的 `error` 字段；
//! 校验错误属于调用方的编程错误，直接以 `Err` 返回。

use thiserror::Error;

/// 客户端错误
#[derive(Debug, Error)]
pub enum ClientError {
    /// 网络层失败（连接、超时、读取 body）
    #[error("请求失败: {0}")]
    Network(#[from] reqwest::Error),

    /// 服务器返回非 2xx 状态码
    #[error("HTTP 错误 {status}: {message}")]
    Http { status: u16, message: String },

    /// 响应无法反序列化
    #[error("反序列化响应失败: {0}")]
    Decode(#[from] serde_json::Error),

    /// 认证服务返回的业务错误
    #[error("{0}")]
    Auth(String),

    /// 缺少必填参数等调用方错误
    #[error("参数校验失败: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 是否为校验错误（其余均视为请求错误）
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP 状态码（仅 `Http` 变体）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
