//! GoTrue（Supabase Auth）认证服务实现
//!
//! 使用 email + password 登录，会话保存在内存中

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::im::auth::listener::{
    AuthEvent, AuthListenerRegistry, AuthStateListener, AuthSubscription,
};
use crate::im::auth::models::{AuthSession, AuthUser, Credentials};
use crate::im::auth::provider::AuthProvider;
use crate::im::error::{ClientError, Result};
use crate::im::serialization::generate_operation_id;

/// token / signup 接口的响应
///
/// 开启邮箱确认时 signup 只返回用户，没有 token
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
}

/// GoTrue 的错误响应，不同版本字段名不一样
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl GoTrueError {
    fn into_message(self, fallback: String) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or(fallback)
    }
}

pub struct GoTrueAuthProvider {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
    listeners: AuthListenerRegistry,
}

impl GoTrueAuthProvider {
    pub fn new(auth_url: impl Into<String>, anon_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            client,
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
            listeners: AuthListenerRegistry::new(),
        })
    }

    pub fn into_shared(self) -> Arc<dyn AuthProvider> {
        Arc::new(self)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/auth/v1{}", self.auth_url, path);
        let operation_id = generate_operation_id();
        debug!("[Auth]   {} {}, 操作ID: {}", method, url, operation_id);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("operationID", operation_id)
    }

    fn stored_session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: Option<AuthSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// 读取响应，非 2xx 时转换成认证错误
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation_name: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let fallback = format!("{}失败 (HTTP {})", operation_name, status.as_u16());
            let message = serde_json::from_slice::<GoTrueError>(&body)
                .unwrap_or_default()
                .into_message(fallback);
            error!("[Auth] {}失败，HTTP状态: {}, 错误: {}", operation_name, status, message);
            return Err(ClientError::Auth(message));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn password_grant(&self, path: &str, email: &str, password: &str, operation_name: &str) -> Result<AuthSession> {
        let credentials = Credentials::new(email, password);
        let response = self
            .request(reqwest::Method::POST, path)
            .json(&credentials)
            .send()
            .await?;
        let resp: TokenResponse = Self::read_json(response, operation_name).await?;

        let (Some(access_token), Some(user)) = (resp.access_token, resp.user) else {
            warn!("[Auth] {}响应中缺少用户或会话", operation_name);
            return Err(ClientError::Auth(format!(
                "{}失败：未返回用户或会话",
                operation_name
            )));
        };
        let session = AuthSession {
            access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
            user,
        };
        self.store_session(Some(session.clone()));
        info!("[Auth] ✅ {}成功，用户ID: {}", operation_name, session.user.id);
        self.listeners.emit(AuthEvent::SignedIn(session.clone())).await;
        Ok(session)
    }
}

#[async_trait]
impl AuthProvider for GoTrueAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        info!("[Auth] 🔐 正在登录...");
        self.password_grant("/token?grant_type=password", email, password, "登录")
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        info!("[Auth] 📝 正在注册...");
        self.password_grant("/signup", email, password, "注册").await
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let result = match previous {
            Some(session) => {
                let response = self
                    .request(reqwest::Method::POST, "/logout")
                    .bearer_auth(&session.access_token)
                    .send()
                    .await;
                match response {
                    Ok(resp) if resp.status().is_success() => Ok(()),
                    Ok(resp) => {
                        let status = resp.status();
                        Err(ClientError::Auth(format!("登出失败 (HTTP {})", status.as_u16())))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };
        info!("[Auth] 👋 已登出");
        self.listeners.emit(AuthEvent::SignedOut).await;
        result
    }

    async fn get_current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.stored_session())
    }

    async fn get_current_user(&self) -> Result<Option<AuthUser>> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };
        let response = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!("[Auth] token 已失效，HTTP状态: {}", status);
            return Ok(None);
        }
        let user: AuthUser = Self::read_json(response, "获取当前用户").await?;
        Ok(Some(user))
    }

    fn subscribe(&self, listener: Arc<dyn AuthStateListener>) -> AuthSubscription {
        self.listeners.subscribe(listener)
    }
}
