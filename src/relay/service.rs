//! Orchestration of the relay: what happens on each inbound event.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::relay::compose::{self, MEDIA_PLACEHOLDER, RelayKind, UserInfo};
use crate::relay::gateway::Gateway;
use crate::relay::intent::{self, MenuAction};
use crate::relay::keyboard;
use crate::relay::l10n::{Catalog, Locale};
use crate::relay::state::{Conversation, Mode};
use crate::relay::store::{Store, StoreError};

/// Settings the relay needs from the outside.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Username of the bot account, for composing deep links.
    pub bot_username: String,
    /// Users who see sender identity on their relayed deliveries.
    pub admin_ids: Vec<i64>,
    /// Chat that receives a notice for every comment.
    pub moderation_chat_id: i64,
    /// Locale used when neither a chosen locale nor the client's
    /// language code is usable.
    pub default_locale: Locale,
}

/// What arrived in an inbound message, as far as relaying cares.
#[derive(Debug, Clone)]
pub enum InboundContent {
    Text(String),
    /// Anything that is not plain text travels by copy, so the original
    /// chat and message id are needed.
    Media { chat_id: i64, message_id: i64, caption: Option<String> },
}

impl InboundContent {
    /// The textual body, if any: the text itself or the media caption,
    /// trimmed. Captionless media has none.
    fn body(&self) -> Option<&str> {
        let raw = match self {
            InboundContent::Text(text) => Some(text.as_str()),
            InboundContent::Media { caption, .. } => caption.as_deref(),
        };
        raw.map(str::trim).filter(|body| !body.is_empty())
    }
}

/// The relay itself: owns the store, the outbound gateway, and the string
/// catalog. Handlers feed it events and persist the conversation state it
/// hands back.
pub struct RelayService {
    store: Store,
    gateway: Arc<dyn Gateway>,
    catalog: Catalog,
    config: RelayConfig,
}

impl RelayService {
    pub fn new(store: Store, gateway: Arc<dyn Gateway>, catalog: Catalog, config: RelayConfig) -> Self {
        Self { store, gateway, catalog, config }
    }

    /// The persistence layer, for callers that need to look at it.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Classify a menu selection against every locale's labels.
    pub fn classify_menu(&self, text: &str) -> Option<MenuAction> {
        intent::classify_menu(&self.catalog, text)
    }

    /// `/start`, with or without a deep-link payload. Registers the user
    /// (idempotently), then either arms a pending relay or shows the menu.
    pub async fn handle_start(
        &self,
        user: &UserInfo,
        conversation: Conversation,
        payload: Option<&str>,
    ) -> Result<Conversation, StoreError> {
        let locale = self.locale_of(user, &conversation);
        self.store.register_user(
            user.id,
            user.username.as_deref(),
            Some(user.first_name.as_str()),
            user.last_name.as_deref(),
            Utc::now(),
        )?;

        let Some(raw) = payload else {
            self.menu_notice(user.id, locale, "welcome").await;
            return Ok(conversation.reset());
        };

        match raw.parse::<i64>() {
            Ok(receiver) => {
                self.notify(user.id, locale, "compose-prompt").await;
                Ok(conversation.with_mode(Mode::AwaitingRelayMessage { receiver }))
            }
            Err(_) => {
                info!("Rejected malformed deep link payload from {}: {raw:?}", user.id);
                self.notify(user.id, locale, "invalid-link").await;
                Ok(conversation)
            }
        }
    }

    /// Content sent while a relay target is pending. Delivery moves the
    /// user back to idle; a failed delivery leaves them composing so they
    /// can try again.
    pub async fn handle_relay_content(
        &self,
        user: &UserInfo,
        conversation: Conversation,
        receiver: i64,
        content: &InboundContent,
    ) -> Result<Conversation, StoreError> {
        let locale = self.locale_of(user, &conversation);
        match self.deliver(user, locale, RelayKind::Message, receiver, content).await? {
            Some(_) => {
                self.notify(user.id, locale, "message-sent").await;
                Ok(conversation.reset())
            }
            None => Ok(conversation),
        }
    }

    /// A reply to some earlier delivered copy. Routes to the counterparty
    /// if the delivery id is tracked and the replier was one of the two
    /// ends; anything else is dropped without a response. Never changes
    /// conversation state.
    pub async fn handle_reply(
        &self,
        user: &UserInfo,
        conversation: &Conversation,
        replied_delivery_id: i64,
        content: &InboundContent,
    ) -> Result<(), StoreError> {
        let Some(counterparty) = self.store.find_counterparty(replied_delivery_id, user.id)? else {
            debug!("No route for reply from {} to delivery {replied_delivery_id}", user.id);
            return Ok(());
        };

        let locale = self.locale_of(user, conversation);
        if self.deliver(user, locale, RelayKind::Reply, counterparty, content).await?.is_some() {
            self.notify(user.id, locale, "reply-sent").await;
        }
        Ok(())
    }

    /// Text while collecting comments. The Back label (any locale) exits
    /// to the menu; everything else is one comment, one moderation
    /// notice, and a self-loop.
    pub async fn handle_comment_text(
        &self,
        user: &UserInfo,
        conversation: Conversation,
        text: &str,
    ) -> Result<Conversation, StoreError> {
        let locale = self.locale_of(user, &conversation);

        if intent::classify_menu(&self.catalog, text) == Some(MenuAction::Back) {
            self.menu_notice(user.id, locale, "menu-back").await;
            return Ok(conversation.reset());
        }

        self.store.record_comment(Some(user.id), text, None)?;
        info!("Recorded comment from {}", user.id);
        self.forward_comment(user, text).await;
        self.notify(user.id, locale, "comment-thanks").await;
        Ok(conversation)
    }

    /// Text while a language choice is pending. A language button sets
    /// the locale and returns to the menu; anything else stays put with
    /// an invalid-selection notice.
    pub async fn handle_language_text(
        &self,
        user: &UserInfo,
        conversation: Conversation,
        text: &str,
    ) -> Result<Conversation, StoreError> {
        match intent::classify_language(text) {
            Some(choice) => {
                info!("User {} switched language to {}", user.id, choice.code());
                self.menu_notice(user.id, choice, "language-changed").await;
                Ok(conversation.with_locale(choice).reset())
            }
            None => {
                let locale = self.locale_of(user, &conversation);
                self.notify(user.id, locale, "language-invalid").await;
                Ok(conversation)
            }
        }
    }

    /// A menu selection while idle.
    pub async fn handle_menu(
        &self,
        user: &UserInfo,
        conversation: Conversation,
        action: MenuAction,
    ) -> Result<Conversation, StoreError> {
        let locale = self.locale_of(user, &conversation);
        match action {
            MenuAction::CreateLink => {
                self.notify(user.id, locale, "link-created").await;
                self.notify(user.id, locale, "link-share").await;
                let link = compose::deep_link(&self.config.bot_username, user.id);
                if let Err(e) = self.gateway.send_text(user.id, &link).await {
                    warn!("Failed to send link to {}: {e}", user.id);
                }
                Ok(conversation.reset())
            }
            MenuAction::About => {
                self.notify(user.id, locale, "about").await;
                Ok(conversation.reset())
            }
            MenuAction::Comments => {
                let prompt = self.catalog.text(locale, "comment-prompt");
                let back = keyboard::back_only(&self.catalog, locale);
                if let Err(e) = self.gateway.send_menu(user.id, &prompt, back).await {
                    warn!("Failed to send comment prompt to {}: {e}", user.id);
                }
                Ok(conversation.with_mode(Mode::AwaitingComment))
            }
            MenuAction::Language => {
                let prompt = self.catalog.text(locale, "language-prompt");
                if let Err(e) = self.gateway.send_menu(user.id, &prompt, keyboard::language_menu()).await {
                    warn!("Failed to send language prompt to {}: {e}", user.id);
                }
                Ok(conversation.with_mode(Mode::AwaitingLanguageChoice))
            }
            // Back with nothing pending; the menu is already there.
            MenuAction::Back => Ok(conversation),
        }
    }

    /// Deliver content to `receiver` and record the routing row. Returns
    /// the delivery id, or `None` when the platform rejected the send, in
    /// which case the sender got a failure notice and nothing was
    /// recorded.
    async fn deliver(
        &self,
        sender: &UserInfo,
        locale: Locale,
        kind: RelayKind,
        receiver: i64,
        content: &InboundContent,
    ) -> Result<Option<i64>, StoreError> {
        let to_admin = self.config.admin_ids.contains(&receiver);
        let body = content.body();
        let composed = compose::relay_body(
            &self.catalog,
            locale,
            kind,
            body.unwrap_or(MEDIA_PLACEHOLDER),
            sender,
            to_admin,
        );

        let sent = match content {
            InboundContent::Text(_) => self.gateway.relay_text(receiver, &composed).await,
            InboundContent::Media { chat_id, message_id, .. } => {
                self.gateway.copy_media(receiver, *chat_id, *message_id, &composed).await
            }
        };

        let delivery_id = match sent {
            Ok(id) => id,
            Err(e) => {
                warn!("Delivery from {} to {receiver} failed: {e}", sender.id);
                self.notify(sender.id, locale, "delivery-failed").await;
                return Ok(None);
            }
        };

        self.store.record_message(sender.id, receiver, body, Some(delivery_id), None)?;
        info!("Relayed {kind:?} from {} to {receiver}, delivery id {delivery_id}", sender.id);
        Ok(Some(delivery_id))
    }

    /// The locale to render with: the explicit choice, else the language
    /// the user's client reports, else the configured default.
    fn locale_of(&self, user: &UserInfo, conversation: &Conversation) -> Locale {
        conversation
            .locale
            .or_else(|| user.language_code.as_deref().and_then(Locale::from_code))
            .unwrap_or(self.config.default_locale)
    }

    /// Localized best-effort notice; delivery problems only log.
    async fn notify(&self, chat_id: i64, locale: Locale, key: &str) {
        let text = self.catalog.text(locale, key);
        if let Err(e) = self.gateway.send_text(chat_id, &text).await {
            warn!("Failed to send notice to {chat_id}: {e}");
        }
    }

    /// Localized notice with the main menu keyboard attached.
    async fn menu_notice(&self, chat_id: i64, locale: Locale, key: &str) {
        let text = self.catalog.text(locale, key);
        let menu = keyboard::main_menu(&self.catalog, locale);
        if let Err(e) = self.gateway.send_menu(chat_id, &text, menu).await {
            warn!("Failed to send menu to {chat_id}: {e}");
        }
    }

    /// Forward a comment to the moderation chat; failures only log.
    async fn forward_comment(&self, author: &UserInfo, text: &str) {
        let notice = compose::moderation_notice(author, text);
        if let Err(e) = self.gateway.send_text(self.config.moderation_chat_id, &notice).await {
            warn!("Failed to forward comment to moderation chat: {e}");
        }
    }
}
