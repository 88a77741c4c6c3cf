//! 认证状态

use tracing::debug;

use crate::im::auth::models::Session;

pub const LOGIN_FAILED: &str = "登录失败";

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    session: Option<Session>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 是否已登录（与 token 是否存在同步变化）
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    pub fn begin_session_pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// 登录 / 注册成功：整体替换会话
    pub fn begin_session_fulfilled(&mut self, session: Session) {
        debug!("[Store/Auth] 会话建立，用户ID: {}", session.user_id);
        self.loading = false;
        self.error = None;
        self.session = Some(session);
    }

    /// 登录 / 注册失败：保留原有会话，只记录错误
    pub fn begin_session_rejected(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.loading = false;
        self.error = Some(if error.is_empty() {
            LOGIN_FAILED.to_string()
        } else {
            error
        });
    }

    pub fn end_session_pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// 登出结束：无论网络结果如何都清除会话
    pub fn end_session_settled(&mut self) {
        debug!("[Store/Auth] 会话已清除");
        self.loading = false;
        self.session = None;
    }

    pub fn restore_session_pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// 恢复已有会话或根据认证事件同步（None 表示未登录）
    pub fn restore_session(&mut self, session: Option<Session>) {
        self.loading = false;
        self.session = session;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(token: &str) -> Session {
        Session {
            user_id: "u-1".into(),
            email: "a@b.c".into(),
            access_token: token.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn failed_login_then_retry_clears_error() {
        let mut state = AuthState::default();
        state.begin_session_pending();
        state.begin_session_rejected("Invalid login credentials");
        assert!(!state.is_authenticated());
        assert!(state.session().is_none());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Invalid login credentials"));

        state.begin_session_pending();
        assert!(state.error.is_none());
        state.begin_session_fulfilled(session("t-1"));
        assert!(state.is_authenticated());
        assert_eq!(state.token(), Some("t-1"));
        assert!(state.error.is_none());
    }

    #[test]
    fn rejection_preserves_prior_session() {
        let mut state = AuthState::default();
        state.begin_session_fulfilled(session("t-1"));
        state.begin_session_pending();
        state.begin_session_rejected("");
        assert_eq!(state.token(), Some("t-1"));
        assert_eq!(state.error.as_deref(), Some(LOGIN_FAILED));
    }

    #[test]
    fn end_session_always_clears() {
        let mut state = AuthState::default();
        state.begin_session_fulfilled(session("t-1"));
        state.end_session_pending();
        state.end_session_settled();
        assert!(!state.is_authenticated());
        assert!(state.token().is_none());
        assert!(!state.loading);
    }

    #[test]
    fn logout_and_restore_start_without_stale_error() {
        let mut state = AuthState::default();
        state.begin_session_rejected("Invalid login credentials");
        state.end_session_pending();
        assert!(state.error.is_none());
        state.end_session_settled();

        state.begin_session_rejected("Invalid login credentials");
        state.restore_session_pending();
        assert!(state.error.is_none());
        assert!(state.loading);
        state.restore_session(None);
        assert!(!state.loading);
    }
}
