//! 认证 hook
//!
//! 登录成功后先把 token 写入 [`ApiClient`]，再完成仓库转换，
//! 保证之后发起的会话 / 消息请求都已带上认证信息。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::im::api_client::ApiClient;
use crate::im::auth::listener::{AuthEvent, AuthStateListener, AuthSubscription};
use crate::im::auth::models::{AuthUser, Credentials, Session};
use crate::im::auth::provider::AuthProvider;
use crate::im::error::{ClientError, Result};
use crate::im::hooks::HookResult;
use crate::im::store::{AuthState, Store};

#[derive(Clone)]
pub struct AuthHook {
    store: Store,
    provider: Arc<dyn AuthProvider>,
    api: ApiClient,
}

impl AuthHook {
    pub fn new(store: Store, provider: Arc<dyn AuthProvider>, api: ApiClient) -> Self {
        Self {
            store,
            provider,
            api,
        }
    }

    pub fn state(&self) -> AuthState {
        self.store.read(|s| s.auth.clone())
    }

    fn loading(&self) -> bool {
        self.store.read(|s| s.auth.loading)
    }

    fn validate(credentials: &Credentials) -> Result<()> {
        if credentials.email.trim().is_empty() {
            return Err(ClientError::validation("邮箱不能为空"));
        }
        if credentials.password.is_empty() {
            return Err(ClientError::validation("密码不能为空"));
        }
        Ok(())
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<HookResult<Session>> {
        self.begin_session(credentials, false).await
    }

    pub async fn signup(&self, credentials: &Credentials) -> Result<HookResult<Session>> {
        self.begin_session(credentials, true).await
    }

    async fn begin_session(
        &self,
        credentials: &Credentials,
        signup: bool,
    ) -> Result<HookResult<Session>> {
        Self::validate(credentials)?;
        self.store.update(|s| s.auth.begin_session_pending());

        let email = credentials.email.trim();
        let result = if signup {
            self.provider.sign_up(email, &credentials.password).await
        } else {
            self.provider.sign_in(email, &credentials.password).await
        };

        match result {
            Ok(auth_session) => {
                let session = Session::from_auth(&auth_session);
                // token 必须先于任何依赖它的请求生效
                self.api.set_auth_token(Some(session.access_token.clone()));
                self.store
                    .update(|s| s.auth.begin_session_fulfilled(session.clone()));
                info!("[AuthHook] ✅ 已登录，用户ID: {}", session.user_id);
                Ok(HookResult::ok(session, self.loading()))
            }
            Err(e) => {
                let msg = e.to_string();
                error!("[AuthHook] ❌ {}失败: {}", if signup { "注册" } else { "登录" }, msg);
                self.store
                    .update(|s| s.auth.begin_session_rejected(msg.clone()));
                let stored = self.store.read(|s| s.auth.error.clone()).unwrap_or(msg);
                Ok(HookResult::failed(stored, self.loading()))
            }
        }
    }

    /// 登出（尽力而为：认证服务失败只记录日志，本地会话总会被清除）
    pub async fn logout(&self) -> HookResult<()> {
        self.store.update(|s| s.auth.end_session_pending());
        if let Err(e) = self.provider.sign_out().await {
            warn!("[AuthHook] ⚠️ 认证服务登出失败，仍清除本地会话: {}", e);
        }
        self.api.set_auth_token(None);
        self.store.update(|s| s.auth.end_session_settled());
        info!("[AuthHook] 👋 已登出");
        HookResult::ok((), self.loading())
    }

    /// 恢复认证服务中已有的会话（应用启动时调用）
    pub async fn restore_session(&self) -> HookResult<Session> {
        self.store.update(|s| s.auth.restore_session_pending());

        let auth_session = match self.provider.get_current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.store.update(|s| s.auth.restore_session(None));
                return HookResult::empty(self.loading());
            }
            Err(e) => {
                error!("[AuthHook] 获取初始会话失败: {}", e);
                self.store.update(|s| s.auth.restore_session(None));
                return HookResult::failed(e.to_string(), self.loading());
            }
        };

        let token = auth_session.access_token.clone();
        self.api.set_auth_token(Some(token.clone()));
        match self.provider.get_current_user().await {
            Ok(Some(user)) => {
                let session = Session::from_user(&user, token);
                self.store
                    .update(|s| s.auth.restore_session(Some(session.clone())));
                info!("[AuthHook] 🔄 已恢复会话，用户ID: {}", session.user_id);
                HookResult::ok(session, self.loading())
            }
            Ok(None) => {
                self.api.set_auth_token(None);
                self.store.update(|s| s.auth.restore_session(None));
                HookResult::empty(self.loading())
            }
            Err(e) => {
                warn!("[AuthHook] 恢复会话时获取用户失败: {}", e);
                self.api.set_auth_token(None);
                self.store.update(|s| s.auth.restore_session(None));
                HookResult::failed(e.to_string(), self.loading())
            }
        }
    }

    /// 检查当前 token 是否仍然有效；无效时清除会话
    pub async fn test_auth(&self) -> HookResult<bool> {
        match self.provider.get_current_user().await {
            Ok(Some(_)) => HookResult::ok(true, self.loading()),
            other => {
                if let Err(e) = other {
                    warn!("[AuthHook] 认证检查失败: {}", e);
                }
                self.api.set_auth_token(None);
                self.store.update(|s| s.auth.restore_session(None));
                HookResult::ok(false, self.loading())
            }
        }
    }

    pub async fn current_user(&self) -> HookResult<AuthUser> {
        match self.provider.get_current_user().await {
            Ok(Some(user)) => HookResult::ok(user, self.loading()),
            Ok(None) => HookResult::empty(self.loading()),
            Err(e) => HookResult::failed(e.to_string(), self.loading()),
        }
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.auth.clear_error());
    }

    /// 订阅认证服务的状态变更，并同步到仓库和 API 客户端
    pub fn watch_auth_state(&self) -> AuthSubscription {
        self.provider.subscribe(Arc::new(AuthStateSync::new(
            self.store.clone(),
            self.api.clone(),
        )))
    }
}

/// 把认证事件同步到仓库和 API 客户端的监听器
pub struct AuthStateSync {
    store: Store,
    api: ApiClient,
}

impl AuthStateSync {
    pub fn new(store: Store, api: ApiClient) -> Self {
        Self { store, api }
    }
}

#[async_trait]
impl AuthStateListener for AuthStateSync {
    async fn on_auth_state_changed(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(auth_session) => {
                info!("[AuthSync] 收到登录事件，用户ID: {}", auth_session.user.id);
                self.api
                    .set_auth_token(Some(auth_session.access_token.clone()));
                let session = Session::from_auth(&auth_session);
                self.store
                    .update(|s| s.auth.restore_session(Some(session)));
            }
            AuthEvent::SignedOut => {
                info!("[AuthSync] 收到登出事件");
                self.api.set_auth_token(None);
                self.store.update(|s| s.auth.restore_session(None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::auth::GoTrueAuthProvider;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hook(server: &MockServer) -> (AuthHook, Store, ApiClient, Arc<dyn AuthProvider>) {
        let store = Store::new();
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let provider = GoTrueAuthProvider::new(server.uri(), "anon", Duration::from_secs(5))
            .unwrap()
            .into_shared();
        (
            AuthHook::new(store.clone(), provider.clone(), api.clone()),
            store,
            api,
            provider,
        )
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_json(serde_json::json!({"email": "a@b.c", "password": "wrong"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_json(serde_json::json!({"email": "a@b.c", "password": "right"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-ok",
                "refresh_token": "r",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": "a@b.c"}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn failed_login_then_successful_retry() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let (hook, store, api, _) = hook(&server);

        let result = hook
            .login(&Credentials::new("a@b.c", "wrong"))
            .await
            .unwrap();
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("Invalid login credentials"));
        let state = store.read(|s| s.auth.clone());
        assert!(!state.is_authenticated());
        assert!(state.session().is_none());
        assert!(!api.has_auth_token());

        let result = hook
            .login(&Credentials::new("a@b.c", "right"))
            .await
            .unwrap();
        assert!(result.is_ok());
        let state = hook.state();
        assert!(state.is_authenticated());
        assert!(state.error.is_none());
        assert_eq!(api.auth_token().as_deref(), Some("tok-ok"));
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected_without_request() {
        let server = MockServer::start().await;
        let (hook, store, _, _) = hook(&server);
        let err = hook.login(&Credentials::new(" ", "pw")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(!store.read(|s| s.auth.loading));
    }

    #[tokio::test]
    async fn logout_clears_even_when_provider_fails() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (hook, _, api, _) = hook(&server);

        hook.login(&Credentials::new("a@b.c", "right")).await.unwrap();
        let result = hook.logout().await;
        assert!(result.is_ok());
        assert!(!hook.state().is_authenticated());
        assert!(!api.has_auth_token());
    }

    #[tokio::test]
    async fn auth_events_flow_into_store_until_unsubscribed() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let (hook, store, api, provider) = hook(&server);

        let subscription = hook.watch_auth_state();
        // 绕过 hook 直接通过认证服务登录，仓库依然同步
        provider.sign_in("a@b.c", "right").await.unwrap();
        assert!(store.read(|s| s.auth.is_authenticated()));
        assert_eq!(api.auth_token().as_deref(), Some("tok-ok"));

        subscription.unsubscribe();
        provider.sign_out().await.unwrap();
        assert!(store.read(|s| s.auth.is_authenticated()));
    }

    #[tokio::test]
    async fn restore_session_without_provider_session_is_empty() {
        let server = MockServer::start().await;
        let (hook, _, _, _) = hook(&server);
        let result = hook.restore_session().await;
        assert!(result.data.is_none());
        assert!(result.error.is_none());
        assert!(!hook.state().loading);
    }
}
