//! 消息列表状态
//!
//! 只缓存一个会话的消息，切换会话时整体替换。
//! 每次拉取消息都会签发一个 [`FetchTicket`]，只有最新且会话仍匹配的票据才能写回结果，
//! 新的拉取会取消旧票据对应的请求。

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::im::message::models::Message;

pub const FETCH_MESSAGES_FAILED: &str = "获取消息失败";
pub const SEND_MESSAGE_FAILED: &str = "发送消息失败";

/// 一次进行中的消息拉取
#[derive(Debug, Clone)]
pub struct FetchTicket {
    seq: u64,
    chat_id: String,
    cancel: CancellationToken,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// 被更新的拉取取代时触发
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 追加消息的结果
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub message: Message,
    /// 服务器确认的会话 ID
    pub chat_id: String,
    /// 发送时没有指定会话、由服务器新建了会话
    pub new_chat_created: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MessageState {
    messages: Vec<Message>,
    current_chat_id: Option<String>,
    pub error: Option<String>,
    next_seq: u64,
    in_flight: Option<FetchTicket>,
    /// 拉取进行期间本地追加的消息，拉取结果写回时保留
    appended_during_fetch: Vec<Message>,
    /// 进行中的发送请求数
    sending: usize,
}

impl MessageState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 当前消息列表所属的会话
    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    /// 拉取或发送任一仍在进行
    pub fn loading(&self) -> bool {
        self.is_fetching() || self.is_sending()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_sending(&self) -> bool {
        self.sending > 0
    }

    fn cancel_in_flight(&mut self) {
        if let Some(prev) = self.in_flight.take() {
            debug!(
                "[Store/Message] 取消旧的消息拉取 #{}，会话ID: {}",
                prev.seq, prev.chat_id
            );
            prev.cancel.cancel();
        }
        self.appended_during_fetch.clear();
    }

    /// 切换消息列表所属会话；会话变化时丢弃旧消息并取消旧会话的拉取
    fn track_chat(&mut self, chat_id: &str) {
        if self.current_chat_id.as_deref() != Some(chat_id) {
            self.cancel_in_flight();
            self.messages.clear();
            self.current_chat_id = Some(chat_id.to_string());
        }
    }

    fn upsert(messages: &mut Vec<Message>, message: Message) {
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => *slot = message,
            None => messages.push(message),
        }
    }

    /// 追加一条消息，同 ID 的消息原位替换
    fn push(&mut self, message: Message) {
        self.track_chat(&message.chat_id);
        if self.in_flight.is_some() {
            Self::upsert(&mut self.appended_during_fetch, message.clone());
        }
        Self::upsert(&mut self.messages, message);
    }

    fn accepts(&self, ticket: &FetchTicket) -> bool {
        let latest = self.in_flight.as_ref().map(|t| t.seq) == Some(ticket.seq);
        latest && self.current_chat_id.as_deref() == Some(ticket.chat_id.as_str())
    }

    fn settle_send(&mut self) {
        self.sending = self.sending.saturating_sub(1);
    }

    /// 开始拉取某个会话的消息，返回本次拉取的票据
    ///
    /// 若目标会话与当前不同，旧消息立即清空，避免显示过期内容
    pub fn list_messages_pending(&mut self, chat_id: &str) -> FetchTicket {
        self.cancel_in_flight();
        self.track_chat(chat_id);
        self.error = None;
        self.next_seq += 1;
        let ticket = FetchTicket {
            seq: self.next_seq,
            chat_id: chat_id.to_string(),
            cancel: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// 写回拉取结果；票据过期时丢弃并返回 false
    ///
    /// 拉取期间本地追加、而服务端列表中还没有的消息保留在末尾
    pub fn list_messages_fulfilled(&mut self, ticket: &FetchTicket, messages: Vec<Message>) -> bool {
        if !self.accepts(ticket) {
            debug!(
                "[Store/Message] 丢弃过期的消息拉取结果 #{}，会话ID: {}",
                ticket.seq, ticket.chat_id
            );
            return false;
        }
        self.in_flight = None;
        self.messages = messages;
        for local in std::mem::take(&mut self.appended_during_fetch) {
            if !self.messages.iter().any(|m| m.id == local.id) {
                self.messages.push(local);
            }
        }
        true
    }

    pub fn list_messages_rejected(&mut self, ticket: &FetchTicket, error: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            debug!(
                "[Store/Message] 丢弃过期的消息拉取错误 #{}，会话ID: {}",
                ticket.seq, ticket.chat_id
            );
            return false;
        }
        let error = error.into();
        self.in_flight = None;
        self.appended_during_fetch.clear();
        self.error = Some(if error.is_empty() {
            FETCH_MESSAGES_FAILED.to_string()
        } else {
            error
        });
        true
    }

    pub fn append_message_pending(&mut self) {
        self.sending += 1;
        self.error = None;
    }

    /// 用户消息发送成功
    ///
    /// `requested_chat_id` 是发送时指定的会话；为空说明服务器新建了会话，
    /// 调用方据此决定是否刷新会话列表
    pub fn append_user_message_fulfilled(
        &mut self,
        requested_chat_id: Option<&str>,
        message: Message,
    ) -> AppendOutcome {
        self.settle_send();
        let outcome = AppendOutcome {
            chat_id: message.chat_id.clone(),
            new_chat_created: requested_chat_id.is_none(),
            message: message.clone(),
        };
        if outcome.new_chat_created {
            debug!("[Store/Message] 服务器新建会话，会话ID: {}", outcome.chat_id);
        }
        self.push(message);
        outcome
    }

    pub fn append_assistant_message_fulfilled(&mut self, message: Message) -> AppendOutcome {
        self.settle_send();
        let outcome = AppendOutcome {
            chat_id: message.chat_id.clone(),
            new_chat_created: false,
            message: message.clone(),
        };
        self.push(message);
        outcome
    }

    pub fn append_message_rejected(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.settle_send();
        self.error = Some(if error.is_empty() {
            SEND_MESSAGE_FAILED.to_string()
        } else {
            error
        });
    }

    /// 本地直接追加（例如服务器随响应返回的助手回复）
    pub fn add_message(&mut self, message: Message) {
        self.push(message);
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.appended_during_fetch.clear();
    }

    pub fn set_current_chat_id(&mut self, chat_id: &str) {
        self.track_chat(chat_id);
    }

    /// 清除所属会话，同时取消进行中的拉取
    pub fn clear_current_chat_id(&mut self) {
        self.cancel_in_flight();
        self.current_chat_id = None;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
