//! 认证状态监听器回调接口

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;

use crate::im::auth::models::AuthSession;

/// 认证状态变更事件
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
}

/// 认证状态监听器（对应认证服务的 onAuthStateChange）
#[async_trait]
pub trait AuthStateListener: Send + Sync {
    async fn on_auth_state_changed(&self, event: AuthEvent);
}

/// 空实现（默认监听器）
pub struct EmptyAuthStateListener;

#[async_trait]
impl AuthStateListener for EmptyAuthStateListener {
    async fn on_auth_state_changed(&self, _event: AuthEvent) {}
}

type ListenerMap = Mutex<HashMap<u64, Arc<dyn AuthStateListener>>>;

/// 监听器注册表，认证服务实现用它来分发事件
#[derive(Default)]
pub struct AuthListenerRegistry {
    next_id: AtomicU64,
    listeners: Arc<ListenerMap>,
}

impl AuthListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器，返回的句柄 drop 或调用 `unsubscribe` 时自动注销
    pub fn subscribe(&self, listener: Arc<dyn AuthStateListener>) -> AuthSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        AuthSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次通知所有监听器（先复制一份列表，回调期间不持锁）
    pub async fn emit(&self, event: AuthEvent) {
        let listeners: Vec<Arc<dyn AuthStateListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener.on_auth_state_changed(event.clone()).await;
        }
    }
}

/// 订阅句柄
#[must_use = "句柄被 drop 时会立即取消订阅"]
pub struct AuthSubscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}
