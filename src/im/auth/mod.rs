//! 认证模块
//!
//! 认证服务接口、GoTrue 实现以及认证状态监听

pub mod gotrue;
pub mod listener;
pub mod models;
pub mod provider;

// 重新导出主要类型
pub use gotrue::GoTrueAuthProvider;
pub use listener::{
    AuthEvent, AuthListenerRegistry, AuthStateListener, AuthSubscription, EmptyAuthStateListener,
};
pub use models::{AuthSession, AuthUser, Credentials, Session};
pub use provider::AuthProvider;
