//! 实体仓库
//!
//! 内存中保存认证、会话列表、消息列表三类实体，各自维护 loading / error。
//! 所有修改都通过命名的状态转换完成，转换本身不做任何 I/O；
//! I/O 由 hook 层发起，仓库只消费请求结果。

pub mod auth_state;
pub mod chat_state;
pub mod message_state;

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

pub use auth_state::AuthState;
pub use chat_state::ChatState;
pub use message_state::{AppendOutcome, FetchTicket, MessageState};

/// 三类实体的完整状态，也作为 UI 渲染用的快照
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub auth: AuthState,
    pub chat: ChatState,
    pub message: MessageState,
}

/// 仓库的共享句柄
///
/// 仓库是三类实体的唯一写入方。转换在锁内同步执行且不会挂起，
/// 每次转换后版本号加一，订阅者据此重新读取快照
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<EntityStore>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(EntityStore::default())),
            revision: Arc::new(revision),
        }
    }

    /// 只读访问
    pub fn read<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// 执行一次状态转换并通知订阅者
    ///
    /// 不比较前后状态：即使转换没有改变任何字段（例如选中不存在的会话），
    /// 版本号也会加一，订阅者会收到一次通知
    pub fn update<R>(&self, f: impl FnOnce(&mut EntityStore) -> R) -> R {
        let result = {
            let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    pub fn snapshot(&self) -> EntityStore {
        self.read(Clone::clone)
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// 订阅状态变更（值为版本号）
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
