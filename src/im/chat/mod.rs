//! 会话模块
//!
//! 会话列表相关的 HTTP API 与本地模型

pub mod api;
pub mod models;

// 重新导出主要类型
pub use api::{ChatApi, MAX_TITLE_LEN};
pub use models::{Chat, ChatCreate, ChatCreated};
