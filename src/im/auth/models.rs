//! 认证相关模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::im::serialization::flexible_datetime;

/// 登录 / 注册凭据
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// 不打印密码
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// 认证服务中的用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "flexible_datetime::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_datetime::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 认证服务返回的会话（token + 用户）
#[derive(Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// 客户端持有的登录态
///
/// 全局只有一份；`access_token` 会附加到之后的所有 API 请求上
#[derive(Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn from_auth(session: &AuthSession) -> Self {
        Self::from_user(&session.user, session.access_token.clone())
    }

    pub fn from_user(user: &AuthUser, access_token: String) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone().unwrap_or_default(),
            access_token,
            created_at: user.created_at.unwrap_or_else(Utc::now),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::new("a@b.c", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));

        let user = AuthUser {
            id: "u-1".into(),
            email: Some("a@b.c".into()),
            created_at: None,
            updated_at: None,
        };
        let session = Session::from_user(&user, "secret-token".into());
        assert!(!format!("{:?}", session).contains("secret-token"));
        assert_eq!(session.email, "a@b.c");
    }
}
