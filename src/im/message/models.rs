//! 消息本地模型定义

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::im::serialization::flexible_datetime;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

/// 生成回复时使用的大模型提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
    HuggingFace,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "huggingface" => Ok(Self::HuggingFace),
            other => Err(format!("未知的模型提供方: {}", other)),
        }
    }
}

/// 消息实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// 所属会话 ID
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
}

/// 创建消息请求体
///
/// `chat_id` 为空时由服务器新建会话
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<LlmProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_rag: Option<bool>,
}

/// 创建消息响应
///
/// 发送用户消息时服务器会同步生成助手回复，`ai_response` / `ai_message_id` 即回复内容
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default)]
    pub ai_message_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl MessageResponse {
    /// 发送的消息本身
    pub fn message(&self) -> Message {
        Message {
            id: self.id.clone(),
            chat_id: self.chat_id.clone(),
            role: self.role,
            content: self.content.clone(),
            created_at: self.created_at,
        }
    }

    /// 服务器附带的助手回复（需同时有内容和消息 ID）
    pub fn ai_reply(&self) -> Option<Message> {
        let content = self.ai_response.clone()?;
        let id = self.ai_message_id.clone()?;
        Some(Message {
            id,
            chat_id: self.chat_id.clone(),
            role: MessageRole::Assistant,
            content,
            created_at: self.created_at,
        })
    }
}

/// 用户消息的附件（只携带文件名，内容上传不在本模块范围内）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// 发送用户消息的可选参数
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub attachments: Vec<Attachment>,
    pub llm_provider: Option<LlmProvider>,
    pub use_rag: bool,
}
