//! 会话 HTTP API 客户端
//!
//! 负责所有会话相关的 HTTP 请求

use tracing::{debug, info};

use crate::im::api_client::{path_segment, ApiClient};
use crate::im::chat::models::{Chat, ChatCreate, ChatCreated};
use crate::im::error::{ClientError, Result};

/// 会话标题最大长度（与服务端校验一致）
pub const MAX_TITLE_LEN: usize = 120;

/// 会话相关的 HTTP API 客户端
#[derive(Clone)]
pub struct ChatApi {
    client: ApiClient,
}

impl ChatApi {
    /// `client` 负责附加认证 token
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 去除首尾空白并校验标题长度
    pub fn normalize_title(title: &str) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("会话标题不能为空"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ClientError::validation(format!(
                "会话标题不能超过 {} 个字符",
                MAX_TITLE_LEN
            )));
        }
        Ok(title.to_string())
    }

    /// 创建会话
    pub async fn create_chat(&self, title: &str) -> Result<ChatCreated> {
        let body = ChatCreate {
            title: Self::normalize_title(title)?,
        };
        info!("[ChatAPI] 📡 请求创建会话");
        debug!("[ChatAPI]   标题: {}", body.title);

        let created: ChatCreated = self.client.post("/chats", &body, "创建会话").await?;
        info!("[ChatAPI] ✅ 会话创建成功，会话ID: {}", created.id);
        Ok(created)
    }

    /// 获取当前用户的全部会话（服务端按更新时间倒序）
    pub async fn get_chats(&self) -> Result<Vec<Chat>> {
        info!("[ChatAPI] 📡 请求会话列表");
        let chats: Vec<Chat> = self.client.get("/chats", "会话列表").await?;
        info!("[ChatAPI] ✅ 会话列表响应，会话数: {}", chats.len());
        Ok(chats)
    }

    /// 按 ID 获取单个会话
    pub async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("会话ID不能为空"));
        }
        info!("[ChatAPI] 📡 请求会话详情，会话ID: {}", chat_id);
        self.client
            .get(&format!("/chats/{}", path_segment(chat_id)), "会话详情")
            .await
    }
}
