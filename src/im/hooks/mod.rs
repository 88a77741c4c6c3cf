//! 同步 hooks
//!
//! 每个 hook 负责一类 UI 关注点：把外部 API 调用与仓库的状态转换组合起来。
//! 预期内的失败（网络、HTTP、认证服务）写入对应实体的 `error` 并体现在 [`HookResult`] 中，
//! 不会以 `Err` 抛出；只有参数校验失败才返回 `Err`。

pub mod auth;
pub mod chat;
pub mod message;

pub use auth::{AuthHook, AuthStateSync};
pub use chat::ChatHook;
pub use message::{MessageHook, SendResult};

/// hook 调用结果：`{ data, loading, error }`
#[derive(Debug, Clone, PartialEq)]
pub struct HookResult<T> {
    pub data: Option<T>,
    /// 调用结束时该实体是否仍有请求在进行
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> HookResult<T> {
    pub fn ok(data: T, loading: bool) -> Self {
        Self {
            data: Some(data),
            loading,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: Some(error.into()),
        }
    }

    /// 没有结果也没有错误（例如请求被更新的请求取代）
    pub fn empty(loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HookResult<U> {
        HookResult {
            data: self.data.map(f),
            loading: self.loading,
            error: self.error,
        }
    }
}
