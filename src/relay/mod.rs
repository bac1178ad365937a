//! Relay module - routes anonymous messages between Telegram users.

pub mod compose;
pub mod gateway;
pub mod intent;
pub mod keyboard;
pub mod l10n;
pub mod service;
pub mod state;
pub mod store;

pub use compose::UserInfo;
pub use gateway::{Gateway, GatewayError, TelegramGateway};
pub use intent::{MenuAction, StartCommand};
pub use l10n::{Catalog, CatalogError, Locale};
pub use service::{InboundContent, RelayConfig, RelayService};
pub use state::{Conversation, Mode, RelayDialogue};
pub use store::{Store, StoreError};
