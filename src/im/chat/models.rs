//! 会话（聊天）本地模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::im::serialization::flexible_datetime;

/// 会话实体，与 `GET /chats` 返回的结构一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// 会话 ID（服务器分配）
    pub id: String,
    pub title: String,
    #[serde(with = "flexible_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub updated_at: DateTime<Utc>,
    /// 最后一条消息时间（从未发过消息时为空）
    #[serde(default, with = "flexible_datetime::option")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: i64,
}

impl Chat {
    /// 根据创建接口的返回值构造本地会话（服务器不返回时间戳，使用本地时间）
    pub fn from_created(created: ChatCreated, now: DateTime<Utc>) -> Self {
        Self {
            id: created.id,
            title: created.title,
            created_at: now,
            updated_at: now,
            last_message_at: None,
            message_count: 0,
        }
    }
}

/// 创建会话请求体
#[derive(Debug, Clone, Serialize)]
pub struct ChatCreate {
    pub title: String,
}

/// 创建会话响应
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCreated {
    pub id: String,
    pub title: String,
}
