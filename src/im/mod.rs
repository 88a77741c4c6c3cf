pub mod api_client;
pub mod auth;
pub mod chat;
pub mod client;
pub mod error;
pub mod hooks;
pub mod message;
pub mod serialization;
pub mod store;
pub mod types;

// 重新导出客户端与错误类型
pub use client::{ClientConfig, StudyBuddyClient};
pub use error::{ClientError, Result};
pub use hooks::HookResult;
