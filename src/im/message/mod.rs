//! 消息模块
//!
//! 消息相关的 HTTP API 与本地模型

pub mod api;
pub mod models;

// 重新导出主要类型
pub use api::{compose_content, MessageApi};
pub use models::{
    Attachment, LlmProvider, Message, MessageCreate, MessageResponse, MessageRole, SendOptions,
};
