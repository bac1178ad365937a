use std::sync::Arc;

use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use whisperlink::config::Config;
use whisperlink::relay::intent;
use whisperlink::relay::{
    Catalog, Conversation, Gateway, InboundContent, Mode, RelayConfig, RelayDialogue,
    RelayService, Store, TelegramGateway, UserInfo,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "whisperlink.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("whisperlink.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting whisperlink...");
    info!("Loaded config from {config_path}");
    info!("Moderation chat: {}", config.moderation_chat_id);
    if !config.admin_ids.is_empty() {
        info!("Admin IDs: {:?}", config.admin_ids);
    }

    let store = match Store::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database '{}': {e}", config.database_path.display());
            std::process::exit(1);
        }
    };

    let catalog = match Catalog::new() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load string catalogs: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Personal links embed the bot's username, so not knowing it is fatal.
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            error!("Failed to get bot info: {e}");
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn Gateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let service = Arc::new(RelayService::new(
        store,
        gateway,
        catalog,
        RelayConfig {
            bot_username,
            admin_ids: config.admin_ids.clone(),
            moderation_chat_id: config.moderation_chat_id,
            default_locale: config.default_locale,
        },
    ));

    let handler = dptree::entry().branch(
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<Conversation>, Conversation>()
            .endpoint(handle_message),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![InMemStorage::<Conversation>::new(), service])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(
    msg: Message,
    dialogue: RelayDialogue,
    conversation: Conversation,
    service: Arc<RelayService>,
) -> HandlerResult {
    // Relaying is a private-chat affair; ignore everything else.
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user = UserInfo {
        id: from.id.0 as i64,
        username: from.username.clone(),
        first_name: from.first_name.clone(),
        last_name: from.last_name.clone(),
        language_code: from.language_code.clone(),
    };

    // /start interrupts whatever was pending.
    if let Some(command) = msg.text().and_then(intent::parse_start) {
        let next = service.handle_start(&user, conversation, command.payload).await?;
        dialogue.update(next).await?;
        return Ok(());
    }

    // An armed relay target consumes whatever arrives next, replies included.
    if let Mode::AwaitingRelayMessage { receiver } = conversation.mode {
        let next = service
            .handle_relay_content(&user, conversation, receiver, &inbound_content(&msg))
            .await?;
        dialogue.update(next).await?;
        return Ok(());
    }

    // Replies to delivered copies route on their own and change no state.
    if let Some(replied) = msg.reply_to_message() {
        service
            .handle_reply(&user, &conversation, replied.id.0 as i64, &inbound_content(&msg))
            .await?;
        return Ok(());
    }

    match conversation.mode {
        Mode::AwaitingComment => {
            if let Some(text) = msg.text() {
                let next = service.handle_comment_text(&user, conversation, text).await?;
                dialogue.update(next).await?;
            }
        }
        Mode::AwaitingLanguageChoice => {
            if let Some(text) = msg.text() {
                let next = service.handle_language_text(&user, conversation, text).await?;
                dialogue.update(next).await?;
            }
        }
        Mode::Idle => {
            if let Some(action) = msg.text().and_then(|text| service.classify_menu(text)) {
                let next = service.handle_menu(&user, conversation, action).await?;
                dialogue.update(next).await?;
            }
        }
        // Consumed above.
        Mode::AwaitingRelayMessage { .. } => {}
    }

    Ok(())
}

/// What to relay out of an inbound message. Plain text travels as text;
/// anything else is copied by id, with its caption if there is one.
fn inbound_content(msg: &Message) -> InboundContent {
    match msg.text() {
        Some(text) => InboundContent::Text(text.to_string()),
        None => InboundContent::Media {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0 as i64,
            caption: msg.caption().map(str::to_string),
        },
    }
}
