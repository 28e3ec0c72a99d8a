//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;
use crate::funnel::{EventKind, InboundEvent, MenuButton, Reply};

/// What kind of interaction a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Free text typed by the user.
    Text,
    /// A button press; `content` is the action id.
    MenuAction,
    /// A slash command; `content` is the command name without `/`.
    Command,
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced this message.
    pub channel: String,
    /// Channel-specific sender identifier.
    pub user_id: String,
    pub user_name: Option<String>,
    pub kind: MessageKind,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Channel-specific routing data (chat id, message id, ...).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    /// Create a free-text message.
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            kind: MessageKind::Text,
            content: content.to_string(),
            received_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    /// Create a button-press message.
    pub fn menu_action(channel: &str, user_id: &str, action_id: &str) -> Self {
        Self {
            kind: MessageKind::MenuAction,
            ..Self::new(channel, user_id, action_id)
        }
    }

    /// Create a slash-command message.
    pub fn command(channel: &str, user_id: &str, command: &str) -> Self {
        Self {
            kind: MessageKind::Command,
            ..Self::new(channel, user_id, command)
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    /// Key of the funnel session this message belongs to.
    pub fn session_id(&self) -> String {
        format!("{}:{}", self.channel, self.user_id)
    }

    /// Convert to the funnel's inbound event.
    pub fn to_event(&self) -> InboundEvent {
        let kind = match self.kind {
            MessageKind::Text => EventKind::Text(self.content.clone()),
            MessageKind::MenuAction => EventKind::MenuAction(self.content.clone()),
            MessageKind::Command => EventKind::Command(self.content.clone()),
        };
        InboundEvent::new(self.session_id(), kind)
    }
}

/// A response to send back through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Buttons to attach, if any.
    pub menu: Option<Vec<MenuButton>>,
    /// Prefer editing the message that carried the pressed button.
    pub edit: bool,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            menu: None,
            edit: false,
        }
    }
}

impl From<Reply> for OutgoingResponse {
    fn from(reply: Reply) -> Self {
        Self {
            content: reply.text,
            menu: reply.menu,
            edit: reply.edit,
        }
    }
}

/// Stream of incoming messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique channel name, matched against [`IncomingMessage::channel`].
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a response to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Check that the channel can reach its backend.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

/// Extract the command name from `/name@bot args`. Returns `None` for plain text.
pub fn parse_command(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix('/')?;
    let word = rest.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_combines_channel_and_user() {
        let msg = IncomingMessage::new("telegram", "42", "hi");
        assert_eq!(msg.session_id(), "telegram:42");
    }

    #[test]
    fn to_event_keeps_kind() {
        let msg = IncomingMessage::menu_action("cli", "local-user", "menu_packages");
        assert_eq!(
            msg.to_event(),
            InboundEvent::new(
                "cli:local-user",
                EventKind::MenuAction("menu_packages".into())
            )
        );

        let msg = IncomingMessage::command("cli", "local-user", "start");
        assert_eq!(msg.to_event().kind, EventKind::Command("start".into()));

        let msg = IncomingMessage::new("cli", "local-user", "foo@bar.com");
        assert_eq!(msg.to_event().kind, EventKind::Text("foo@bar.com".into()));
    }

    #[test]
    fn parse_command_variants() {
        assert_eq!(parse_command("/start"), Some("start".into()));
        assert_eq!(parse_command("  /Start@KyvarionBot now"), Some("start".into()));
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
        assert_eq!(parse_command("start"), None);
        assert_eq!(parse_command("done /start"), None);
    }

    #[test]
    fn outgoing_from_reply() {
        let reply = Reply::text("hello").editing();
        let out = OutgoingResponse::from(reply);
        assert_eq!(out.content, "hello");
        assert!(out.edit);
        assert!(out.menu.is_none());
    }
}
