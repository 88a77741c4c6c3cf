//! 消息 HTTP API 客户端
//!
//! 负责所有消息相关的 HTTP 请求

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::im::api_client::{path_segment, ApiClient};
use crate::im::error::{ClientError, Result};
use crate::im::message::models::{
    Attachment, Message, MessageCreate, MessageResponse, MessageRole, SendOptions,
};
use crate::im::serialization::deserialize_vec_or_null;

/// 把附件名拼接进消息正文：`正文 [Files: a.pdf, b.png]`
///
/// 正文为空且没有附件时返回校验错误
pub fn compose_content(content: &str, attachments: &[Attachment]) -> Result<String> {
    if content.trim().is_empty() && attachments.is_empty() {
        return Err(ClientError::validation("消息内容不能为空"));
    }
    if attachments.is_empty() {
        return Ok(content.to_string());
    }
    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    Ok(format!("{} [Files: {}]", content, names.join(", ")))
}

#[derive(Deserialize)]
struct ProvidersResp {
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    providers: Vec<String>,
}

/// 消息相关的 HTTP API 客户端
#[derive(Clone)]
pub struct MessageApi {
    client: ApiClient,
}

impl MessageApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 创建消息（底层接口）
    pub async fn create_message(&self, body: &MessageCreate) -> Result<MessageResponse> {
        info!(
            "[MessageAPI] 📡 请求发送消息，角色: {}, 会话ID: {}",
            body.role,
            body.chat_id.as_deref().unwrap_or("<新会话>")
        );
        debug!("[MessageAPI]   内容长度: {}", body.content.len());

        let resp: MessageResponse = self.client.post("/messages", body, "发送消息").await?;
        if resp.success == Some(false) {
            warn!(
                "[MessageAPI] ⚠️ 消息已保存但助手回复生成失败，消息ID: {}",
                resp.id
            );
        }
        info!(
            "[MessageAPI] ✅ 消息发送成功，消息ID: {}, 会话ID: {}",
            resp.id, resp.chat_id
        );
        Ok(resp)
    }

    /// 获取某个会话的全部消息（按创建时间升序）
    pub async fn get_messages_by_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("会话ID不能为空"));
        }
        info!("[MessageAPI] 📡 请求会话消息，会话ID: {}", chat_id);
        let messages: Vec<Message> = self
            .client
            .get(
                &format!("/messages/by-chat/{}", path_segment(chat_id)),
                "会话消息",
            )
            .await?;
        info!(
            "[MessageAPI] ✅ 会话消息响应，会话ID: {}, 消息数: {}",
            chat_id,
            messages.len()
        );
        Ok(messages)
    }

    /// 发送用户消息，`chat_id` 为空时服务器会新建会话
    pub async fn send_user_message(
        &self,
        content: &str,
        chat_id: Option<&str>,
        options: &SendOptions,
    ) -> Result<MessageResponse> {
        let content = compose_content(content, &options.attachments)?;
        let body = MessageCreate {
            chat_id: chat_id.map(str::to_string),
            role: MessageRole::User,
            content,
            llm_provider: options.llm_provider,
            use_rag: options.use_rag.then_some(true),
        };
        self.create_message(&body).await
    }

    /// 发送助手消息（必须指定会话）
    pub async fn send_assistant_message(
        &self,
        content: &str,
        chat_id: &str,
    ) -> Result<MessageResponse> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("助手消息必须指定会话ID"));
        }
        let body = MessageCreate {
            chat_id: Some(chat_id.to_string()),
            role: MessageRole::Assistant,
            content: compose_content(content, &[])?,
            llm_provider: None,
            use_rag: None,
        };
        self.create_message(&body).await
    }

    /// 获取服务端可用的大模型提供方（无需认证）
    pub async fn get_llm_providers(&self) -> Result<Vec<String>> {
        let resp: ProvidersResp = self
            .client
            .get("/messages/providers", "模型提供方列表")
            .await?;
        Ok(resp.providers)
    }
}
