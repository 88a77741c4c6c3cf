//! 消息 hook
//!
//! 拉取消息时持有仓库签发的 [`FetchTicket`]：票据被更新的拉取取代后，
//! 正在进行的请求立即放弃，迟到的结果也不会写回仓库。

use tracing::{debug, error, info};

use crate::im::error::{ClientError, Result};
use crate::im::hooks::HookResult;
use crate::im::message::api::{compose_content, MessageApi};
use crate::im::message::models::{Message, SendOptions};
use crate::im::store::{AppendOutcome, MessageState, Store};

/// 发送消息的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SendResult {
    pub outcome: AppendOutcome,
    /// 服务器随响应生成的助手回复（已追加到消息列表）
    pub ai_reply: Option<Message>,
}

#[derive(Clone)]
pub struct MessageHook {
    store: Store,
    api: MessageApi,
}

impl MessageHook {
    pub fn new(store: Store, api: MessageApi) -> Self {
        Self { store, api }
    }

    pub fn state(&self) -> MessageState {
        self.store.read(|s| s.message.clone())
    }

    fn loading(&self) -> bool {
        self.store.read(|s| s.message.loading())
    }

    fn stored_error(&self, fallback: String) -> String {
        self.store
            .read(|s| s.message.error.clone())
            .unwrap_or(fallback)
    }

    /// 拉取某个会话的消息
    ///
    /// 被后续拉取取代时返回空结果，既不写入数据也不写入错误
    pub async fn fetch_messages_by_chat(&self, chat_id: &str) -> Result<HookResult<Vec<Message>>> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("会话ID不能为空"));
        }
        let ticket = self
            .store
            .update(|s| s.message.list_messages_pending(chat_id));
        debug!("[MessageHook] 开始拉取消息 #{}，会话ID: {}", ticket.seq(), chat_id);

        let result = tokio::select! {
            biased;
            _ = ticket.cancellation().cancelled() => {
                debug!("[MessageHook] 消息拉取 #{} 已被取代", ticket.seq());
                return Ok(HookResult::empty(self.loading()));
            }
            result = self.api.get_messages_by_chat(chat_id) => result,
        };

        match result {
            Ok(messages) => {
                let applied = self
                    .store
                    .update(|s| s.message.list_messages_fulfilled(&ticket, messages.clone()));
                if !applied {
                    return Ok(HookResult::empty(self.loading()));
                }
                Ok(HookResult::ok(messages, self.loading()))
            }
            Err(e) => {
                let msg = e.to_string();
                let applied = self
                    .store
                    .update(|s| s.message.list_messages_rejected(&ticket, msg.clone()));
                if !applied {
                    return Ok(HookResult::empty(self.loading()));
                }
                error!("[MessageHook] ❌ 拉取会话 {} 的消息失败: {}", chat_id, msg);
                Ok(HookResult::failed(self.stored_error(msg), self.loading()))
            }
        }
    }

    /// 发送用户消息
    ///
    /// `chat_id` 为空时服务器新建会话，结果中的 `new_chat_created` 为 true
    pub async fn send_user_message(
        &self,
        content: &str,
        chat_id: Option<&str>,
        options: &SendOptions,
    ) -> Result<HookResult<SendResult>> {
        compose_content(content, &options.attachments)?;
        self.store.update(|s| s.message.append_message_pending());

        match self.api.send_user_message(content, chat_id, options).await {
            Ok(resp) => {
                let ai_reply = resp.ai_reply();
                let outcome = self.store.update(|s| {
                    let outcome = s
                        .message
                        .append_user_message_fulfilled(chat_id, resp.message());
                    if let Some(reply) = &ai_reply {
                        s.message.add_message(reply.clone());
                    }
                    outcome
                });
                info!(
                    "[MessageHook] ✅ 用户消息已追加，会话ID: {}, 助手回复: {}",
                    outcome.chat_id,
                    ai_reply.is_some()
                );
                Ok(HookResult::ok(
                    SendResult { outcome, ai_reply },
                    self.loading(),
                ))
            }
            Err(e) => {
                error!("[MessageHook] ❌ 发送用户消息失败: {}", e);
                let msg = e.to_string();
                self.store
                    .update(|s| s.message.append_message_rejected(msg.clone()));
                Ok(HookResult::failed(self.stored_error(msg), self.loading()))
            }
        }
    }

    pub async fn send_assistant_message(
        &self,
        content: &str,
        chat_id: &str,
    ) -> Result<HookResult<AppendOutcome>> {
        if chat_id.is_empty() {
            return Err(ClientError::validation("助手消息必须指定会话ID"));
        }
        compose_content(content, &[])?;
        self.store.update(|s| s.message.append_message_pending());

        match self.api.send_assistant_message(content, chat_id).await {
            Ok(resp) => {
                let outcome = self
                    .store
                    .update(|s| s.message.append_assistant_message_fulfilled(resp.message()));
                Ok(HookResult::ok(outcome, self.loading()))
            }
            Err(e) => {
                error!("[MessageHook] ❌ 发送助手消息失败: {}", e);
                let msg = e.to_string();
                self.store
                    .update(|s| s.message.append_message_rejected(msg.clone()));
                Ok(HookResult::failed(self.stored_error(msg), self.loading()))
            }
        }
    }

    /// 服务端可用的大模型提供方；不写入仓库
    pub async fn available_llm_providers(&self) -> HookResult<Vec<String>> {
        match self.api.get_llm_providers().await {
            Ok(providers) => HookResult::ok(providers, false),
            Err(e) => HookResult::failed(e.to_string(), false),
        }
    }

    pub fn add_message(&self, message: Message) {
        self.store.update(|s| s.message.add_message(message));
    }

    pub fn clear_messages(&self) {
        self.store.update(|s| s.message.clear_messages());
    }

    pub fn set_current_chat_id(&self, chat_id: &str) {
        self.store.update(|s| s.message.set_current_chat_id(chat_id));
    }

    pub fn clear_current_chat_id(&self) {
        self.store.update(|s| s.message.clear_current_chat_id());
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.store.update(|s| s.message.set_error(error));
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.message.clear_error());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::api_client::ApiClient;
    use crate::im::message::models::MessageRole;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hook(server: &MockServer) -> (MessageHook, Store) {
        let store = Store::new();
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        (MessageHook::new(store.clone(), MessageApi::new(api)), store)
    }

    fn message_json(id: &str, chat_id: &str, role: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "chatId": chat_id,
            "role": role,
            "content": format!("content {}", id),
            "createdAt": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn send_appends_user_message_and_ai_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m-1", "chatId": "c-1", "role": "user", "content": "hi",
                "createdAt": "2024-05-01T10:00:00Z",
                "aiResponse": "hello!", "aiMessageId": "m-2", "success": true
            })))
            .mount(&server)
            .await;
        let (hook, store) = hook(&server);

        let result = hook
            .send_user_message("hi", Some("c-1"), &SendOptions::default())
            .await
            .unwrap();
        let sent = result.data.unwrap();
        assert!(!sent.outcome.new_chat_created);
        assert_eq!(sent.ai_reply.as_ref().map(|m| m.id.as_str()), Some("m-2"));

        let state = store.read(|s| s.message.clone());
        let roles: Vec<_> = state.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_request() {
        let server = MockServer::start().await;
        let (hook, store) = hook(&server);
        let err = hook
            .send_user_message("  ", None, &SendOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(!store.read(|s| s.message.loading()));
    }

    #[tokio::test]
    async fn send_failure_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Not authenticated"})),
            )
            .mount(&server)
            .await;
        let (hook, _) = hook(&server);

        let result = hook
            .send_user_message("hi", None, &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(result.error.as_deref(), Some("HTTP 错误 401: Not authenticated"));
        let state = hook.state();
        assert_eq!(state.error, result.error);
        assert!(state.messages().is_empty());
    }

    #[tokio::test]
    async fn superseded_fetch_returns_empty_and_keeps_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages/by-chat/a"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([message_json("a1", "a", "user")]))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/messages/by-chat/b"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([message_json("b1", "b", "user")])),
            )
            .mount(&server)
            .await;
        let (hook, store) = hook(&server);

        let slow = hook.clone();
        let fast = hook.clone();
        let (a, b) = tokio::join!(slow.fetch_messages_by_chat("a"), async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fast.fetch_messages_by_chat("b").await
        });

        let a = a.unwrap();
        assert!(a.data.is_none());
        assert!(a.error.is_none());
        assert!(b.unwrap().is_ok());

        let state = store.read(|s| s.message.clone());
        assert_eq!(state.current_chat_id(), Some("b"));
        let ids: Vec<_> = state.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b1"]);
        assert!(!state.loading());
    }
}
