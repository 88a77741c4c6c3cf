//! 会话列表状态
//!
//! 会话列表保持服务端顺序；当前会话最多一个，且最终必须指向列表中的某个会话

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::im::chat::models::{Chat, ChatCreated};

pub const CREATE_CHAT_FAILED: &str = "创建会话失败";
pub const FETCH_CHATS_FAILED: &str = "获取会话列表失败";
pub const FETCH_CHAT_FAILED: &str = "获取会话失败";

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    chats: Vec<Chat>,
    current_chat: Option<Chat>,
    pub loading: bool,
    pub error: Option<String>,
}

fn or_default(error: String, fallback: &str) -> String {
    if error.is_empty() {
        fallback.to_string()
    } else {
        error
    }
}

impl ChatState {
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.current_chat.as_ref()
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat.as_ref().map(|c| c.id.as_str())
    }

    pub fn find(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fail(&mut self, error: String, fallback: &str) {
        self.loading = false;
        self.error = Some(or_default(error, fallback));
    }

    pub fn list_chats_pending(&mut self) {
        self.start();
    }

    /// 用服务端列表整体替换本地列表（保持服务端顺序）
    ///
    /// 当前会话若仍在列表中，则换成列表中的最新数据
    pub fn list_chats_fulfilled(&mut self, chats: Vec<Chat>) {
        debug!("[Store/Chat] 会话列表替换，会话数: {}", chats.len());
        self.loading = false;
        self.chats = chats;
        if let Some(current) = &self.current_chat {
            if let Some(fresh) = self.chats.iter().find(|c| c.id == current.id) {
                self.current_chat = Some(fresh.clone());
            }
        }
    }

    /// 失败时保留原列表
    pub fn list_chats_rejected(&mut self, error: impl Into<String>) {
        self.fail(error.into(), FETCH_CHATS_FAILED);
    }

    pub fn create_chat_pending(&mut self) {
        self.start();
    }

    /// 新会话插入列表头部并设为当前会话
    pub fn create_chat_fulfilled(&mut self, created: ChatCreated, now: DateTime<Utc>) -> Chat {
        self.loading = false;
        let chat = Chat::from_created(created, now);
        self.add_chat(chat.clone());
        self.current_chat = Some(chat.clone());
        chat
    }

    pub fn create_chat_rejected(&mut self, error: impl Into<String>) {
        self.fail(error.into(), CREATE_CHAT_FAILED);
    }

    pub fn fetch_chat_pending(&mut self) {
        self.start();
    }

    /// 单个会话获取成功：设为当前会话，并刷新列表中的同一条目
    pub fn fetch_chat_fulfilled(&mut self, chat: Chat) {
        self.loading = false;
        self.update_chat(chat.clone());
        self.current_chat = Some(chat);
    }

    pub fn fetch_chat_rejected(&mut self, error: impl Into<String>) {
        self.fail(error.into(), FETCH_CHAT_FAILED);
    }

    /// 直接选中一个会话对象；列表中已有同 ID 的会话时以列表中的为准
    pub fn select_chat(&mut self, chat: Chat) {
        let chat = self.find(&chat.id).cloned().unwrap_or(chat);
        debug!("[Store/Chat] 选中会话: {}", chat.id);
        self.current_chat = Some(chat);
    }

    /// 按 ID 选中会话；列表中没有该 ID 时不做任何修改
    pub fn select_chat_by_id(&mut self, chat_id: &str) -> bool {
        match self.find(chat_id).cloned() {
            Some(chat) => {
                debug!("[Store/Chat] 按ID选中会话: {}", chat_id);
                self.current_chat = Some(chat);
                true
            }
            None => {
                debug!("[Store/Chat] 会话 {} 不在列表中，忽略选中", chat_id);
                false
            }
        }
    }

    pub fn clear_current_chat(&mut self) {
        self.current_chat = None;
    }

    /// 插入到列表头部，已存在同 ID 的会话时先移除旧条目
    pub fn add_chat(&mut self, chat: Chat) {
        self.chats.retain(|c| c.id != chat.id);
        self.chats.insert(0, chat);
    }

    /// 原位更新同 ID 的会话，不存在时忽略
    pub fn update_chat(&mut self, chat: Chat) {
        if let Some(slot) = self.chats.iter_mut().find(|c| c.id == chat.id) {
            *slot = chat;
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn chat(id: &str) -> Chat {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Chat {
            id: id.into(),
            title: format!("chat {}", id),
            created_at: now,
            updated_at: now,
            last_message_at: None,
            message_count: 0,
        }
    }

    fn created(id: &str) -> ChatCreated {
        ChatCreated {
            id: id.into(),
            title: "New Chat".into(),
        }
    }

    #[test]
    fn list_replaces_in_server_order() {
        let mut state = ChatState::default();
        state.add_chat(chat("stale"));
        let server = vec![chat("c"), chat("a"), chat("b")];
        state.list_chats_pending();
        state.list_chats_fulfilled(server.clone());
        assert_eq!(state.chats(), server.as_slice());
        assert!(!state.loading);
    }

    #[test]
    fn list_failure_keeps_collection() {
        let mut state = ChatState::default();
        state.list_chats_fulfilled(vec![chat("a")]);
        state.list_chats_pending();
        state.list_chats_rejected("boom");
        assert_eq!(state.chats().len(), 1);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn created_chat_goes_first_and_becomes_current() {
        let mut state = ChatState::default();
        state.list_chats_fulfilled(vec![chat("a"), chat("b")]);
        state.create_chat_pending();
        let new_chat = state.create_chat_fulfilled(created("n"), Utc::now());
        assert_eq!(state.chats()[0].id, "n");
        assert_eq!(state.current_chat_id(), Some("n"));

        assert!(state.select_chat_by_id(&new_chat.id));
        assert_eq!(state.current_chat(), Some(&new_chat));
    }

    #[test]
    fn select_unknown_id_is_noop() {
        let mut state = ChatState::default();
        state.list_chats_fulfilled(vec![chat("a")]);
        assert!(state.select_chat_by_id("a"));
        assert!(!state.select_chat_by_id("missing"));
        assert_eq!(state.current_chat_id(), Some("a"));
    }

    #[test]
    fn refresh_updates_current_chat_snapshot() {
        let mut state = ChatState::default();
        state.list_chats_fulfilled(vec![chat("a")]);
        state.select_chat_by_id("a");
        let mut fresh = chat("a");
        fresh.message_count = 7;
        state.list_chats_fulfilled(vec![fresh]);
        assert_eq!(state.current_chat().map(|c| c.message_count), Some(7));
    }

    #[test]
    fn add_chat_keeps_ids_unique() {
        let mut state = ChatState::default();
        state.list_chats_fulfilled(vec![chat("a"), chat("b")]);
        state.add_chat(chat("b"));
        let ids: Vec<&str> = state.chats().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
