//! Mock implementations for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use genesis_addons::{AddonModule, HookError, LifecycleHook};
use genesis_dispatch::{
    DispatchNode, DispatchResult, Flow, MessageRef, Messenger, NodeKind, NodeOwner, Registration,
    Update, handler_fn,
};

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<LifecycleHook>,
    fail_on: Vec<LifecycleHook>,
}

/// Scriptable [`AddonModule`].
///
/// Clones share state, so a test can keep one handle while the runtime owns
/// another. Every hook is declared; scripted ones fail.
#[derive(Debug, Clone)]
pub struct MockModule {
    name: String,
    commands: Option<Arc<DispatchNode>>,
    events: Option<Arc<DispatchNode>>,
    hooks: Vec<LifecycleHook>,
    state: Arc<Mutex<MockState>>,
}

impl MockModule {
    /// A module with no nodes that implements every hook.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: None,
            events: None,
            hooks: LifecycleHook::ALL.to_vec(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn commands_node(&mut self) -> &Arc<DispatchNode> {
        let owner = NodeOwner::addon(self.name.clone());
        self.commands
            .get_or_insert_with(|| DispatchNode::new(NodeKind::Command, owner))
    }

    /// Register a command replying with its own body.
    #[must_use]
    pub fn with_command(mut self, body: &str) -> Self {
        let reply = body.to_string();
        self.commands_node().register(Registration::command(
            body,
            handler_fn(move |ctx| {
                let reply = reply.clone();
                async move {
                    ctx.reply(&reply).await?;
                    Ok(Flow::Handled)
                }
            }),
        ));
        self
    }

    /// Give the module an event node with one handler matching `text`.
    #[must_use]
    pub fn with_event(mut self, name: &str, text: &str) -> Self {
        let owner = NodeOwner::addon(self.name.clone());
        let node = self
            .events
            .get_or_insert_with(|| DispatchNode::new(NodeKind::Event, owner));
        let wanted = text.to_string();
        node.register(Registration::event(
            name,
            move |update: &Update| update.text == wanted,
            handler_fn(|_| async { Ok(Flow::Handled) }),
        ));
        self
    }

    /// Declare only `hooks`; the others are treated as absent.
    #[must_use]
    pub fn with_hooks(mut self, hooks: &[LifecycleHook]) -> Self {
        self.hooks = hooks.to_vec();
        self
    }

    /// Make `hook` return an error.
    #[must_use]
    pub fn failing_on(self, hook: LifecycleHook) -> Self {
        self.lock().fail_on.push(hook);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Hooks invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LifecycleHook> {
        self.lock().calls.clone()
    }

    /// The command node, if any.
    #[must_use]
    pub fn commands(&self) -> Option<&Arc<DispatchNode>> {
        self.commands.as_ref()
    }

    /// The event node, if any.
    #[must_use]
    pub fn events(&self) -> Option<&Arc<DispatchNode>> {
        self.events.as_ref()
    }

    /// Type-erased handle for a module catalog or [`genesis_addons::Addon`].
    #[must_use]
    pub fn as_module(&self) -> Arc<dyn AddonModule> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl AddonModule for MockModule {
    fn command_node(&self) -> Option<Arc<DispatchNode>> {
        self.commands.clone()
    }

    fn event_node(&self) -> Option<Arc<DispatchNode>> {
        self.events.clone()
    }

    fn hooks(&self) -> &[LifecycleHook] {
        &self.hooks
    }

    async fn run_hook(&self, hook: LifecycleHook) -> Result<(), HookError> {
        let mut state = self.lock();
        state.calls.push(hook);
        if state.fail_on.contains(&hook) {
            return Err(HookError(format!("{} refused {hook}", self.name)));
        }
        Ok(())
    }
}

/// A message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Target chat.
    pub chat_id: i64,
    /// Message replied to, if any.
    pub reply_to: Option<i64>,
    /// Text sent or the new text of an edit.
    pub text: String,
    /// Whether this was an edit.
    pub edited: bool,
}

/// [`Messenger`] that records every outbound call.
#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    messages: Arc<Mutex<Vec<SentMessage>>>,
    deleted: Arc<Mutex<Vec<MessageRef>>>,
}

impl RecordingMessenger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-erased handle for the dispatcher.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn Messenger> {
        Arc::new(self.clone())
    }

    /// Everything sent or edited, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Text of the most recent send or edit.
    #[must_use]
    pub fn last_text(&self) -> Option<String> {
        self.messages().pop().map(|m| m.text)
    }

    /// Deleted messages.
    #[must_use]
    pub fn deleted(&self) -> Vec<MessageRef> {
        self.deleted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn push(&self, message: SentMessage) -> usize {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        messages.push(message);
        messages.len()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> DispatchResult<MessageRef> {
        let count = self.push(SentMessage {
            chat_id,
            reply_to,
            text: text.to_string(),
            edited: false,
        });
        Ok(MessageRef {
            chat_id,
            message_id: i64::try_from(count).unwrap_or(i64::MAX),
        })
    }

    async fn edit(&self, message: MessageRef, text: &str) -> DispatchResult<()> {
        self.push(SentMessage {
            chat_id: message.chat_id,
            reply_to: None,
            text: text.to_string(),
            edited: true,
        });
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> DispatchResult<()> {
        self.deleted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
