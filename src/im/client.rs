//! Study Buddy 客户端核心实现模块
//!
//! [`StudyBuddyClient`] 是应用持有的上下文对象：它拥有实体仓库、API 客户端、
//! 认证服务以及三个 hook，并负责跨实体的组合操作（选中会话后拉取消息、
//! 新会话发送后刷新列表）。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::im::api_client::ApiClient;
use crate::im::auth::gotrue::GoTrueAuthProvider;
use crate::im::auth::provider::AuthProvider;
use crate::im::chat::api::ChatApi;
use crate::im::chat::models::Chat;
use crate::im::error::Result;
use crate::im::hooks::{AuthHook, ChatHook, HookResult, MessageHook, SendResult};
use crate::im::message::api::MessageApi;
use crate::im::message::models::{Message, SendOptions};
use crate::im::store::{EntityStore, Store};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 业务 API 基础地址
    pub api_base_url: String,
    /// 认证服务（GoTrue）地址
    pub auth_url: String,
    /// 认证服务的匿名 key，随每个认证请求放在 `apikey` 头中
    pub auth_anon_key: String,
    /// 单个 HTTP 请求的超时时间
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// 创建默认配置（本地开发环境）
    pub fn new() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            auth_url: "http://localhost:54321".to_string(),
            auth_anon_key: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Study Buddy 客户端
#[derive(Clone)]
pub struct StudyBuddyClient {
    config: ClientConfig,
    store: Store,
    api: ApiClient,
    auth: AuthHook,
    chats: ChatHook,
    messages: MessageHook,
}

impl StudyBuddyClient {
    /// 使用自定义认证服务创建客户端
    pub fn new(config: ClientConfig, provider: Arc<dyn AuthProvider>) -> Result<Self> {
        let store = Store::new();
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout)?;
        info!("[Client] 🚀 创建客户端，API地址: {}", api.api_base_url());

        Ok(Self {
            auth: AuthHook::new(store.clone(), provider, api.clone()),
            chats: ChatHook::new(store.clone(), ChatApi::new(api.clone())),
            messages: MessageHook::new(store.clone(), MessageApi::new(api.clone())),
            config,
            store,
            api,
        })
    }

    /// 使用配置中的 GoTrue 认证服务创建客户端
    pub fn with_gotrue(config: ClientConfig) -> Result<Self> {
        let provider = GoTrueAuthProvider::new(
            config.auth_url.clone(),
            config.auth_anon_key.clone(),
            config.request_timeout,
        )?
        .into_shared();
        Self::new(config, provider)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api_client(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthHook {
        &self.auth
    }

    pub fn chats(&self) -> &ChatHook {
        &self.chats
    }

    pub fn messages(&self) -> &MessageHook {
        &self.messages
    }

    /// 当前全部实体状态的快照
    pub fn snapshot(&self) -> EntityStore {
        self.store.snapshot()
    }

    /// 订阅仓库变更（值为版本号）
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// 选中会话并拉取其消息
    ///
    /// 旧会话的消息在请求返回之前就已清空
    pub async fn select_chat(&self, chat: Chat) -> Result<HookResult<Vec<Message>>> {
        let chat_id = chat.id.clone();
        self.chats.select_chat(chat);
        self.messages.fetch_messages_by_chat(&chat_id).await
    }

    /// 按 ID 选中会话并拉取其消息；会话不在列表中时什么都不做
    pub async fn select_chat_by_id(&self, chat_id: &str) -> Result<HookResult<Vec<Message>>> {
        if !self.chats.select_chat_by_id(chat_id) {
            return Ok(HookResult::empty(self.store.read(|s| s.message.loading())));
        }
        self.messages.fetch_messages_by_chat(chat_id).await
    }

    /// 在当前会话中发送用户消息
    ///
    /// 没有当前会话时由服务器新建会话，之后依次刷新会话列表并选中新会话
    pub async fn send_message(
        &self,
        content: &str,
        options: &SendOptions,
    ) -> Result<HookResult<SendResult>> {
        let chat_id = self
            .store
            .read(|s| s.chat.current_chat_id().map(str::to_string));
        let result = self
            .messages
            .send_user_message(content, chat_id.as_deref(), options)
            .await?;

        if let Some(sent) = &result.data {
            if sent.outcome.new_chat_created {
                let new_id = sent.outcome.chat_id.as_str();
                info!("[Client] 🆕 服务器新建了会话 {}，刷新会话列表", new_id);
                self.chats.fetch_chats().await;
                if !self.chats.select_chat_by_id(new_id) {
                    debug!("[Client] 刷新后的会话列表中没有会话 {}", new_id);
                }
            }
        }
        Ok(result)
    }

    /// 开始一个新对话：清除当前会话、消息列表和消息所属会话
    pub fn start_new_chat(&self) {
        self.chats.clear_current_chat();
        self.messages.clear_messages();
        self.messages.clear_current_chat_id();
    }
}
