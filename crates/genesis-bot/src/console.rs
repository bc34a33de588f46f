//! Console stand-in for the chat protocol client.
//!
//! Every stdin line is an outgoing message from the account owner. A line
//! of the form `>ID text` replies to message `ID`. Sent, edited and deleted
//! messages are echoed with their ids so replies can reference them.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use genesis_dispatch::{DispatchError, DispatchResult, MessageRef, Messenger, Update};
use tracing::warn;

use crate::accounts::AccountInfo;

/// Chat id every console message lives in.
pub(crate) const CONSOLE_CHAT: i64 = 0;

/// Messages kept for reply lookups; older ones are forgotten.
const HISTORY_LIMIT: i64 = 1024;

type Output = Box<dyn Write + Send>;

/// [`Messenger`] over a text stream.
pub(crate) struct ConsoleMessenger {
    next_id: AtomicI64,
    history: Mutex<HashMap<i64, String>>,
    out: Mutex<Output>,
}

impl ConsoleMessenger {
    /// Echo to stdout.
    pub(crate) fn stdout() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    pub(crate) fn with_output(out: Output) -> Self {
        Self {
            next_id: AtomicI64::new(1),
            history: Mutex::new(HashMap::new()),
            out: Mutex::new(out),
        }
    }

    /// Profile of the local operator.
    pub(crate) fn whoami(index: usize) -> AccountInfo {
        let username = std::env::var("USER").unwrap_or_else(|_| "owner".to_string());
        AccountInfo {
            id: i64::try_from(index).unwrap_or(i64::MAX),
            first_name: username.clone(),
            last_name: None,
            username,
        }
    }

    fn history(&self) -> MutexGuard<'_, HashMap<i64, String>> {
        self.history.lock().unwrap_or_else(|e| {
            warn!("Console history lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn allocate(&self, text: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut history = self.history();
        if let Some(stale) = id.checked_sub(HISTORY_LIMIT) {
            history.remove(&stale);
        }
        history.insert(id, text.to_string());
        id
    }

    fn print(&self, line: &str) -> DispatchResult<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| {
            warn!("Console output lock poisoned, recovering");
            e.into_inner()
        });
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| DispatchError::Messenger(e.to_string()))
    }

    /// Turn one input line into an update. Blank lines yield nothing.
    pub(crate) fn parse_line(&self, line: &str) -> Option<Update> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }

        let (reply_to, text) = line
            .strip_prefix('>')
            .and_then(|rest| rest.split_once(' '))
            .and_then(|(id, text)| id.parse::<i64>().ok().map(|id| (Some(id), text)))
            .unwrap_or((None, line));

        let id = self.allocate(text);
        let update = Update::outgoing(CONSOLE_CHAT, id, text);
        match reply_to {
            Some(target) => match self.history().get(&target).cloned() {
                Some(quoted) => Some(update.replying_to(target, quoted)),
                None => {
                    warn!(message_id = target, "Reply target not found");
                    Some(update)
                },
            },
            None => Some(update),
        }
    }
}

impl std::fmt::Debug for ConsoleMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleMessenger")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> DispatchResult<MessageRef> {
        let message_id = self.allocate(text);
        let header = match reply_to {
            Some(target) => format!("[#{message_id} -> #{target}]"),
            None => format!("[#{message_id}]"),
        };
        self.print(&format!("{header}\n{text}"))?;
        Ok(MessageRef {
            chat_id,
            message_id,
        })
    }

    async fn edit(&self, message: MessageRef, text: &str) -> DispatchResult<()> {
        if let Some(entry) = self.history().get_mut(&message.message_id) {
            *entry = text.to_string();
        }
        self.print(&format!("[#{} edited]\n{text}", message.message_id))
    }

    async fn delete(&self, message: MessageRef) -> DispatchResult<()> {
        self.history().remove(&message.message_id);
        self.print(&format!("[#{} deleted]", message.message_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_parse_plain_and_blank_lines() {
        let console = ConsoleMessenger::with_output(Box::new(Buffer::default()));
        assert!(console.parse_line("   \n").is_none());
        let update = console.parse_line(".bot\n").unwrap();
        assert_eq!(update.text, ".bot");
        assert_eq!(update.message_id, 1);
        assert!(update.outgoing);
        assert!(update.reply_to.is_none());
    }

    #[tokio::test]
    async fn test_reply_references_sent_message() {
        let buffer = Buffer::default();
        let console = ConsoleMessenger::with_output(Box::new(buffer.clone()));
        let sent = console.send(CONSOLE_CHAT, None, "Name: x").await.unwrap();

        let update = console
            .parse_line(&format!(">{} +", sent.message_id))
            .unwrap();
        assert_eq!(update.text, "+");
        let replied = update.reply_to.unwrap();
        assert_eq!(replied.message_id, sent.message_id);
        assert_eq!(replied.text, "Name: x");
        assert!(buffer.text().contains("[#1]\nName: x"));
    }

    #[tokio::test]
    async fn test_edit_updates_history() {
        let console = ConsoleMessenger::with_output(Box::new(Buffer::default()));
        let first = console.parse_line("hello").unwrap();
        console.edit(first.message_ref(), "hello again").await.unwrap();
        let reply = console.parse_line(">1 -").unwrap();
        assert_eq!(reply.reply_to.unwrap().text, "hello again");
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let console = ConsoleMessenger::with_output(Box::new(Buffer::default()));
        for _ in 0..HISTORY_LIMIT.saturating_add(5) {
            console.parse_line("spam").unwrap();
        }
        assert_eq!(console.history().len(), usize::try_from(HISTORY_LIMIT).unwrap());
        assert!(console.parse_line(">10 +").unwrap().reply_to.is_some());
        assert!(console.parse_line(">1 +").unwrap().reply_to.is_none());

        let last = console.parse_line("bye").unwrap();
        console.delete(last.message_ref()).await.unwrap();
        assert!(!console.history().contains_key(&last.message_id));
        console.edit(last.message_ref(), "ghost").await.unwrap();
        assert!(!console.history().contains_key(&last.message_id));
    }

    #[test]
    fn test_unknown_reply_target_is_plain() {
        let console = ConsoleMessenger::with_output(Box::new(Buffer::default()));
        let update = console.parse_line(">42 +").unwrap();
        assert_eq!(update.text, "+");
        assert!(update.reply_to.is_none());
        let literal = console.parse_line(">not a reply").unwrap();
        assert_eq!(literal.text, ">not a reply");
    }
}
