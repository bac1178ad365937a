//! Outbound text composition. Every string that interpolates user content
//! is HTML-escaped here, before it reaches the wire.

use teloxide::utils::html;

use crate::relay::l10n::{Catalog, Locale};

/// Shown in place of a body for media without a caption.
pub const MEDIA_PLACEHOLDER: &str = "Media message";

/// Identity of the user behind an inbound event, as the platform reports
/// it.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

impl UserInfo {
    /// First and last name joined, as identity blocks display it.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Which leg of the relay a delivery belongs to; picks the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Message,
    Reply,
}

/// Compose the text delivered to the receiving end of a relay.
///
/// `to_admin` swaps the header and appends the sender identity block that
/// configured admins see; ordinary receivers get the anonymous form. The
/// header and footer render in `locale`, which is the sending user's.
pub fn relay_body(
    catalog: &Catalog,
    locale: Locale,
    kind: RelayKind,
    body: &str,
    sender: &UserInfo,
    to_admin: bool,
) -> String {
    let header = match (kind, to_admin) {
        (RelayKind::Message, false) => catalog.text(locale, "anon-message-header"),
        (RelayKind::Reply, false) => catalog.text(locale, "anon-reply-header"),
        (RelayKind::Message, true) => "📨 NEW ANONYMOUS MESSAGE".to_string(),
        (RelayKind::Reply, true) => "📨 ANONYMOUS REPLY".to_string(),
    };

    let mut out = format!("{header}\n\n{}", html::escape(body));
    if to_admin {
        out.push_str(&sender_block(kind, sender));
    }
    out.push_str("\n\n");
    out.push_str(&catalog.text(locale, "reply-footer"));
    out
}

fn sender_block(kind: RelayKind, sender: &UserInfo) -> String {
    let title = match kind {
        RelayKind::Message => "👤 SENDER INFO",
        RelayKind::Reply => "👤 REPLY FROM",
    };
    let username = match &sender.username {
        Some(name) => format!("@{name}"),
        None => "none".to_string(),
    };

    format!(
        "\n\n{}\n👤 Name: {}\n💻 Username: {}\n🆔 ID: {}\n🔗 Profile: {}",
        html::bold(title),
        html::escape(&sender.full_name()),
        html::escape(&username),
        html::code_inline(&sender.id.to_string()),
        html::link(&format!("tg://user?id={}", sender.id), "Open profile"),
    )
}

/// Compose the moderation-group notice for a newly recorded comment.
/// Not localized; the moderation audience reads one language.
pub fn moderation_notice(author: &UserInfo, comment: &str) -> String {
    let username = match &author.username {
        Some(name) => format!("@{name}"),
        None => "no username".to_string(),
    };

    format!(
        "NEW COMMENT / OFFER\n\n{}\n• Name: {}\n• Username: {}\n• ID: {}\n• Profile: {}\n\n{}\n{}",
        html::bold("User"),
        html::escape(&author.full_name()),
        html::escape(&username),
        html::code_inline(&author.id.to_string()),
        html::link(&format!("tg://user?id={}", author.id), "Open"),
        html::bold("Comment"),
        html::escape(comment.trim()),
    )
}

/// The personal deep link a user hands out to receive anonymous messages.
pub fn deep_link(bot_username: &str, user_id: i64) -> String {
    format!("https://t.me/{bot_username}?start={user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> UserInfo {
        UserInfo {
            id: 4242,
            username: Some("sneaky".to_string()),
            first_name: "Sne".to_string(),
            last_name: Some("Aky".to_string()),
            language_code: Some("en".to_string()),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new().unwrap()
    }

    #[test]
    fn test_relay_body_anonymous_message() {
        let text = relay_body(&catalog(), Locale::En, RelayKind::Message, "hey you", &sender(), false);

        assert!(text.starts_with("💌 ANONYMOUS MESSAGE\n\nhey you"));
        assert!(text.ends_with("➡️ Swipe right on this message to reply anonymously"));
        // Nothing about the sender leaks into the anonymous form.
        assert!(!text.contains("Sne"));
        assert!(!text.contains("4242"));
        assert!(!text.contains("SENDER INFO"));
    }

    #[test]
    fn test_relay_body_reply_header() {
        let text = relay_body(&catalog(), Locale::En, RelayKind::Reply, "back at you", &sender(), false);
        assert!(text.starts_with("💌 ANONYMOUS REPLY\n\n"));
    }

    #[test]
    fn test_relay_body_localized_chrome() {
        let text = relay_body(&catalog(), Locale::Ru, RelayKind::Message, "привет", &sender(), false);
        assert!(text.starts_with("💌 АНОНИМНОЕ СООБЩЕНИЕ"));
        assert!(text.contains("Смахните вправо"));
    }

    #[test]
    fn test_relay_body_admin_gets_sender_block() {
        let text = relay_body(&catalog(), Locale::En, RelayKind::Message, "report", &sender(), true);

        assert!(text.starts_with("📨 NEW ANONYMOUS MESSAGE\n\nreport"));
        assert!(text.contains("<b>👤 SENDER INFO</b>"));
        assert!(text.contains("👤 Name: Sne Aky"));
        assert!(text.contains("💻 Username: @sneaky"));
        assert!(text.contains("🆔 ID: <code>4242</code>"));
        assert!(text.contains(r#"<a href="tg://user?id=4242">Open profile</a>"#));
        // The footer still closes the message.
        assert!(text.ends_with("➡️ Swipe right on this message to reply anonymously"));
    }

    #[test]
    fn test_relay_body_admin_reply_block_title() {
        let text = relay_body(&catalog(), Locale::En, RelayKind::Reply, "again", &sender(), true);
        assert!(text.starts_with("📨 ANONYMOUS REPLY\n\n"));
        assert!(text.contains("<b>👤 REPLY FROM</b>"));
    }

    #[test]
    fn test_relay_body_escapes_html_in_body() {
        let text = relay_body(&catalog(), Locale::En, RelayKind::Message, "<script>alert(1)</script> & <3", &sender(), false);
        assert!(text.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; &lt;3"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn test_relay_body_escapes_sender_names() {
        let mut evil = sender();
        evil.first_name = "<b>Bold</b>".to_string();
        evil.last_name = None;
        evil.username = None;

        let text = relay_body(&catalog(), Locale::En, RelayKind::Message, "hi", &evil, true);
        assert!(text.contains("👤 Name: &lt;b&gt;Bold&lt;/b&gt;"));
        assert!(text.contains("💻 Username: none"));
    }

    #[test]
    fn test_moderation_notice_layout() {
        let text = moderation_notice(&sender(), "  make it faster  ");

        assert!(text.starts_with("NEW COMMENT / OFFER\n\n<b>User</b>\n"));
        assert!(text.contains("• Name: Sne Aky"));
        assert!(text.contains("• Username: @sneaky"));
        assert!(text.contains("• ID: <code>4242</code>"));
        assert!(text.contains(r#"• Profile: <a href="tg://user?id=4242">Open</a>"#));
        assert!(text.ends_with("<b>Comment</b>\nmake it faster"));
    }

    #[test]
    fn test_moderation_notice_without_username() {
        let mut author = sender();
        author.username = None;
        let text = moderation_notice(&author, "hello");
        assert!(text.contains("• Username: no username"));
    }

    #[test]
    fn test_moderation_notice_escapes_comment() {
        let text = moderation_notice(&sender(), "a <i>sly</i> & nasty one");
        assert!(text.contains("a &lt;i&gt;sly&lt;/i&gt; &amp; nasty one"));
    }

    #[test]
    fn test_full_name_with_and_without_last_name() {
        let mut user = sender();
        assert_eq!(user.full_name(), "Sne Aky");
        user.last_name = None;
        assert_eq!(user.full_name(), "Sne");
    }

    #[test]
    fn test_deep_link_format() {
        assert_eq!(deep_link("whisperlink_bot", 987654321), "https://t.me/whisperlink_bot?start=987654321");
    }
}
