//! 会话 hook

use chrono::Utc;
use tracing::{error, info};

use crate::im::chat::api::ChatApi;
use crate::im::chat::models::Chat;
use crate::im::error::{ClientError, Result};
use crate::im::hooks::HookResult;
use crate::im::store::{ChatState, Store};

#[derive(Clone)]
pub struct ChatHook {
    store: Store,
    api: ChatApi,
}

impl ChatHook {
    pub fn new(store: Store, api: ChatApi) -> Self {
        Self { store, api }
    }

    pub fn state(&self) -> ChatState {
        self.store.read(|s| s.chat.clone())
    }

    fn loading(&self) -> bool {
        self.store.read(|s| s.chat.loading)
    }

    fn stored_error(&self, fallback: String) -> String {
        self.store.read(|s| s.chat.error.clone()).unwrap_or(fallback)
    }

    /// 创建会话并设为当前会话
    pub async fn create_chat(&self, title: &str) -> Result<HookResult<Chat>> {
        ChatApi::normalize_title(title)?;
        self.store.update(|s| s.chat.create_chat_pending());

        match self.api.create_chat(title).await {
            Ok(created) => {
                let chat = self
                    .store
                    .update(|s| s.chat.create_chat_fulfilled(created, Utc::now()));
                Ok(HookResult::ok(chat, self.loading()))
            }
            Err(e) => {
                error!("[ChatHook] ❌ 创建会话失败: {}", e);
                let msg = e.to_string();
                self.store.update(|s| s.chat.create_chat_rejected(msg.clone()));
                Ok(HookResult::failed(self.stored_error(msg), self.loading()))
            }
        }
    }

    /// 刷新会话列表
    pub async fn fetch_chats(&self) -> HookResult<Vec<Chat>> {
        self.store.update(|s| s.chat.list_chats_pending());

        match self.api.get_chats().await {
            Ok(chats) => {
                info!("[ChatHook] 会话列表已刷新，会话数: {}", chats.len());
                self.store
                    .update(|s| s.chat.list_chats_fulfilled(chats.clone()));
                HookResult::ok(chats, self.loading())
            }
            Err(e) => {
                error!("[ChatHook] ❌ 获取会话列表失败: {}", e);
                let msg = e.to_string();
                self.store.update(|s| s.chat.list_chats_rejected(msg.clone()));
                HookResult::failed(self.stored_error(msg), self.loading())
            }
        }
    }

    /// 获取单个会话并设为当前会话
    pub async fn fetch_chat_by_id(&self, chat_id: &str) -> Result<HookResult<Chat>> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("会话ID不能为空"));
        }
        self.store.update(|s| s.chat.fetch_chat_pending());

        match self.api.get_chat_by_id(chat_id).await {
            Ok(chat) => {
                self.store
                    .update(|s| s.chat.fetch_chat_fulfilled(chat.clone()));
                Ok(HookResult::ok(chat, self.loading()))
            }
            Err(e) => {
                error!("[ChatHook] ❌ 获取会话 {} 失败: {}", chat_id, e);
                let msg = e.to_string();
                self.store.update(|s| s.chat.fetch_chat_rejected(msg.clone()));
                Ok(HookResult::failed(self.stored_error(msg), self.loading()))
            }
        }
    }

    pub fn select_chat(&self, chat: Chat) {
        self.store.update(|s| s.chat.select_chat(chat));
    }

    /// 列表中不存在该会话时返回 false
    pub fn select_chat_by_id(&self, chat_id: &str) -> bool {
        self.store.update(|s| s.chat.select_chat_by_id(chat_id))
    }

    pub fn clear_current_chat(&self) {
        self.store.update(|s| s.chat.clear_current_chat());
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.chat.clear_error());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::api_client::ApiClient;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hook(server: &MockServer) -> (ChatHook, Store) {
        let store = Store::new();
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        (ChatHook::new(store.clone(), ChatApi::new(api)), store)
    }

    fn chat_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z",
            "lastMessageAt": null,
            "messageCount": 0
        })
    }

    #[tokio::test]
    async fn create_chat_prepends_and_selects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chats"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([chat_json("c1", "Old")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chats"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": "c2", "title": "Algebra"})),
            )
            .mount(&server)
            .await;
        let (hook, store) = hook(&server);

        hook.fetch_chats().await;
        let result = hook.create_chat("  Algebra ").await.unwrap();
        assert!(result.is_ok());
        assert!(!result.loading);

        let state = store.read(|s| s.chat.clone());
        let ids: Vec<_> = state.chats().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
        assert_eq!(state.current_chat_id(), Some("c2"));
        assert_eq!(state.chats()[0].message_count, 0);
    }

    #[tokio::test]
    async fn blank_title_is_validation_error() {
        let server = MockServer::start().await;
        let (hook, store) = hook(&server);
        let err = hook.create_chat("   ").await.unwrap_err();
        assert!(err.is_validation());
        assert!(!store.read(|s| s.chat.loading));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chats"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([chat_json("c1", "Old")])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chats"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "boom"})),
            )
            .mount(&server)
            .await;
        let (hook, _) = hook(&server);

        assert!(hook.fetch_chats().await.is_ok());
        let result = hook.fetch_chats().await;
        assert_eq!(result.error.as_deref(), Some("HTTP 错误 500: boom"));
        let state = hook.state();
        assert_eq!(state.chats().len(), 1);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn select_unknown_chat_is_ignored() {
        let server = MockServer::start().await;
        let (hook, _) = hook(&server);
        assert!(!hook.select_chat_by_id("nope"));
        assert!(hook.state().current_chat().is_none());
    }
}
