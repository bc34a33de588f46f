//! Inbound updates and the outbound messaging seam.
//!
//! The protocol client that actually talks to the chat network lives outside
//! this crate. It converts whatever it receives into an [`Update`] and
//! implements [`Messenger`] so handlers can answer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DispatchResult;

/// Address of a message that was sent or edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Chat the message lives in.
    pub chat_id: i64,
    /// Message identifier within the chat.
    pub message_id: i64,
}

/// The message an update replies to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepliedMessage {
    /// Identifier of the replied-to message.
    pub message_id: i64,
    /// Text of the replied-to message.
    pub text: String,
}

/// An inbound text update delivered by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Index of the account that received the update.
    pub account: usize,
    /// Chat the update arrived in.
    pub chat_id: i64,
    /// Identifier of the message carried by the update.
    pub message_id: i64,
    /// Message text.
    pub text: String,
    /// Whether the message was sent by the account owner.
    pub outgoing: bool,
    /// The message this one replies to.
    pub reply_to: Option<RepliedMessage>,
}

impl Update {
    /// Create an outgoing (owner-authored) text update.
    #[must_use]
    pub fn outgoing(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            account: 0,
            chat_id,
            message_id,
            text: text.into(),
            outgoing: true,
            reply_to: None,
        }
    }

    /// Create an incoming text update from someone other than the owner.
    #[must_use]
    pub fn incoming(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            outgoing: false,
            ..Self::outgoing(chat_id, message_id, text)
        }
    }

    /// Attach the message this update replies to.
    #[must_use]
    pub fn replying_to(mut self, message_id: i64, text: impl Into<String>) -> Self {
        self.reply_to = Some(RepliedMessage {
            message_id,
            text: text.into(),
        });
        self
    }

    /// Reference to the message carried by this update.
    #[must_use]
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

/// Outbound side of the protocol client.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a new message, optionally as a reply.
    async fn send(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> DispatchResult<MessageRef>;

    /// Replace the text of an existing message.
    async fn edit(&self, message: MessageRef, text: &str) -> DispatchResult<()>;

    /// Delete a message.
    async fn delete(&self, message: MessageRef) -> DispatchResult<()>;
}

impl std::fmt::Debug for dyn Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger").finish_non_exhaustive()
    }
}

/// Everything a leaf handler gets when it is invoked.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// The update that triggered the handler.
    pub update: Update,
    /// Arguments extracted by the leaf's trigger (empty for event handlers).
    pub arguments: Vec<String>,
    messenger: Arc<dyn Messenger>,
}

impl HandlerContext {
    /// Create a handler context.
    #[must_use]
    pub fn new(update: Update, arguments: Vec<String>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            update,
            arguments,
            messenger,
        }
    }

    /// The messenger for outbound calls.
    #[must_use]
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Everything after the first whitespace-separated token, trimmed.
    ///
    /// Returns an empty string for single-token messages.
    #[must_use]
    pub fn argument_text(&self) -> &str {
        self.update
            .text
            .trim_start()
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest.trim())
    }

    /// Reply to the triggering message.
    ///
    /// # Errors
    ///
    /// Propagates messenger failures.
    pub async fn reply(&self, text: &str) -> DispatchResult<MessageRef> {
        self.messenger
            .send(self.update.chat_id, Some(self.update.message_id), text)
            .await
    }

    /// Edit the triggering message in place.
    ///
    /// # Errors
    ///
    /// Propagates messenger failures.
    pub async fn edit(&self, text: &str) -> DispatchResult<()> {
        self.messenger.edit(self.update.message_ref(), text).await
    }

    /// Append text to the triggering message, separated by a blank line.
    ///
    /// # Errors
    ///
    /// Propagates messenger failures.
    pub async fn append(&self, text: &str) -> DispatchResult<()> {
        let combined = format!("{}\n\n{text}", self.update.text);
        self.edit(&combined).await
    }

    /// Delete the triggering message.
    ///
    /// # Errors
    ///
    /// Propagates messenger failures.
    pub async fn delete(&self) -> DispatchResult<()> {
        self.messenger.delete(self.update.message_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullMessenger;

    #[async_trait]
    impl Messenger for NullMessenger {
        async fn send(&self, chat_id: i64, _: Option<i64>, _: &str) -> DispatchResult<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: 0,
            })
        }
        async fn edit(&self, _: MessageRef, _: &str) -> DispatchResult<()> {
            Ok(())
        }
        async fn delete(&self, _: MessageRef) -> DispatchResult<()> {
            Ok(())
        }
    }

    fn ctx(text: &str) -> HandlerContext {
        HandlerContext::new(Update::outgoing(1, 2, text), vec![], Arc::new(NullMessenger))
    }

    #[test]
    fn argument_text_strips_command_token() {
        assert_eq!(ctx(".addon Weather Bot ").argument_text(), "Weather Bot");
        assert_eq!(ctx(".addon").argument_text(), "");
        assert_eq!(ctx("  .addons   all").argument_text(), "all");
    }

    #[test]
    fn incoming_update_is_not_owner_authored() {
        let update = Update::incoming(5, 6, "hi").replying_to(4, "prev");
        assert!(!update.outgoing);
        assert_eq!(update.reply_to.unwrap().message_id, 4);
    }
}
