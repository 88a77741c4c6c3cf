pub mod im;

// 重新导出常用类型和函数，方便外部使用
pub use im::{
    auth::{AuthProvider, Credentials, GoTrueAuthProvider, Session},
    chat::Chat,
    client::{ClientConfig, StudyBuddyClient},
    error::{ClientError, Result},
    hooks::{HookResult, SendResult},
    message::{Attachment, LlmProvider, Message, MessageRole, SendOptions},
    store::{AppendOutcome, EntityStore},
};
