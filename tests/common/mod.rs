//! Mock implementation of [`whisperlink::relay::Gateway`] for integration tests.
//!
//! Records every outbound call so tests can assert on delivered text and
//! keyboards without hitting Telegram, and hands out sequential message ids
//! the way a real chat would.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::types::KeyboardMarkup;

use whisperlink::relay::{
    Catalog, Gateway, GatewayError, Locale, RelayConfig, RelayService, Store, UserInfo,
};

pub const ADMIN_ID: i64 = 500;
pub const MODERATION_CHAT_ID: i64 = -1009999;
pub const BOT_USERNAME: &str = "whisperlink_bot";

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)] // delivered_id kept for tests that chase delivery ids
pub enum OutboundCall {
    SendText { chat_id: i64, text: String },
    SendMenu { chat_id: i64, text: String, rows: Vec<Vec<String>> },
    RelayText { chat_id: i64, text: String, message_id: i64 },
    CopyMedia { to_chat: i64, from_chat: i64, message_id: i64, caption: String, delivered_id: i64 },
}

/// Mock gateway that records calls and returns sequential message ids.
/// Tests can flip `set_fail_deliveries` to act like a receiver who blocked
/// the bot; plain notices keep working.
pub struct MockGateway {
    calls: Mutex<Vec<OutboundCall>>,
    next_message_id: AtomicI64,
    fail_deliveries: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1000),
            fail_deliveries: AtomicBool::new(false),
        })
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Drains the recorded calls so the next assertion starts clean.
    pub fn take_calls(&self) -> Vec<OutboundCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn set_fail_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    fn next_id(&self) -> i64 {
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }

    fn record(&self, call: OutboundCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn blocked() -> GatewayError {
        GatewayError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked))
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        self.record(OutboundCall::SendText { chat_id, text: text.to_string() });
        Ok(self.next_id())
    }

    async fn send_menu(&self, chat_id: i64, text: &str, keyboard: KeyboardMarkup) -> Result<i64, GatewayError> {
        let rows = keyboard
            .keyboard
            .iter()
            .map(|row| row.iter().map(|button| button.text.clone()).collect())
            .collect();
        self.record(OutboundCall::SendMenu { chat_id, text: text.to_string(), rows });
        Ok(self.next_id())
    }

    async fn relay_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(Self::blocked());
        }
        let message_id = self.next_id();
        self.record(OutboundCall::RelayText { chat_id, text: text.to_string(), message_id });
        Ok(message_id)
    }

    async fn copy_media(
        &self,
        to_chat: i64,
        from_chat: i64,
        message_id: i64,
        caption: &str,
    ) -> Result<i64, GatewayError> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(Self::blocked());
        }
        let delivered_id = self.next_id();
        self.record(OutboundCall::CopyMedia {
            to_chat,
            from_chat,
            message_id,
            caption: caption.to_string(),
            delivered_id,
        });
        Ok(delivered_id)
    }
}

/// A service over an in-memory store, wired to the given mock.
pub fn test_service(gateway: Arc<MockGateway>) -> RelayService {
    let store = Store::in_memory().expect("in-memory store");
    let catalog = Catalog::new().expect("catalog should load");
    RelayService::new(
        store,
        gateway,
        catalog,
        RelayConfig {
            bot_username: BOT_USERNAME.to_string(),
            admin_ids: vec![ADMIN_ID],
            moderation_chat_id: MODERATION_CHAT_ID,
            default_locale: Locale::En,
        },
    )
}

/// A bare user with only a first name, like a fresh Telegram account.
pub fn user(id: i64, first_name: &str) -> UserInfo {
    UserInfo {
        id,
        username: None,
        first_name: first_name.to_string(),
        last_name: None,
        language_code: None,
    }
}
