//! 认证服务接口

use std::sync::Arc;

use async_trait::async_trait;

use crate::im::auth::listener::{AuthStateListener, AuthSubscription};
use crate::im::auth::models::{AuthSession, AuthUser};
use crate::im::error::Result;

/// 第三方认证 / 会话服务
///
/// 实现方负责 token 的签发与保存，并在登录、登出时向订阅者发出事件
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// 登出；无论服务端是否成功，本地会话都会被清除
    async fn sign_out(&self) -> Result<()>;

    /// 当前会话（没有登录时为 None）
    async fn get_current_session(&self) -> Result<Option<AuthSession>>;

    /// 用当前 token 向服务端查询用户，token 失效时为 None
    async fn get_current_user(&self) -> Result<Option<AuthUser>>;

    fn subscribe(&self, listener: Arc<dyn AuthStateListener>) -> AuthSubscription;
}
