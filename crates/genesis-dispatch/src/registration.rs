//! Leaf registrations: the commands and event handlers a node owns.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::context::{HandlerContext, Update};
use crate::error::DispatchResult;

/// Prefix used when a command is registered without explicit prefixes.
pub const DEFAULT_PREFIX: &str = ".";

/// What a handler tells the dispatcher after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The update was consumed; dispatch stops.
    Handled,
    /// The handler declined; dispatch continues with the next leaf.
    Skip,
}

/// The code behind a leaf registration.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle an update that passed the leaf's trigger.
    async fn handle(&self, ctx: &HandlerContext) -> DispatchResult<Flow>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = DispatchResult<Flow>> + Send,
{
    async fn handle(&self, ctx: &HandlerContext) -> DispatchResult<Flow> {
        (self.0)(ctx.clone()).await
    }
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Flow>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Decides whether an event handler wants an update.
///
/// How individual filters are composed is up to the addon; the tree only
/// asks the yes/no question.
pub trait Filter: Send + Sync {
    /// Whether the update should reach the handler.
    fn matches(&self, update: &Update) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Update) -> bool + Send + Sync,
{
    fn matches(&self, update: &Update) -> bool {
        self(update)
    }
}

enum Trigger {
    /// `<prefix><body>` as the first token of the message.
    Command,
    /// An arbitrary filter over the update.
    Event(Box<dyn Filter>),
}

/// A command or event handler registered on a dispatch node.
///
/// Carries its own `enabled` flag (independent of the owning node) and a
/// call counter used for statistics.
pub struct Registration {
    body: String,
    prefixes: Vec<String>,
    description: Option<String>,
    arguments: Vec<String>,
    owner_only: bool,
    enabled: AtomicBool,
    calls: AtomicU64,
    trigger: Trigger,
    handler: Arc<dyn Handler>,
}

impl Registration {
    /// A command triggered by `<prefix><body>` as the first message token.
    #[must_use]
    pub fn command(body: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self::with_trigger(body.into(), Trigger::Command, handler)
    }

    /// An event handler triggered by an arbitrary filter.
    #[must_use]
    pub fn event(
        name: impl Into<String>,
        filter: impl Filter + 'static,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self::with_trigger(name.into(), Trigger::Event(Box::new(filter)), handler)
    }

    fn with_trigger(body: String, trigger: Trigger, handler: Arc<dyn Handler>) -> Self {
        Self {
            body,
            prefixes: vec![DEFAULT_PREFIX.to_string()],
            description: None,
            arguments: Vec::new(),
            owner_only: false,
            enabled: AtomicBool::new(true),
            calls: AtomicU64::new(0),
            trigger,
            handler,
        }
    }

    /// Replace the trigger prefixes.
    #[must_use]
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare the argument names shown in help output.
    #[must_use]
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Only the account owner may trigger this leaf.
    #[must_use]
    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    /// Identifier (command body or handler name).
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Trigger prefixes.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Description, if one was given.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared argument names.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Whether only the owner may trigger this leaf.
    #[must_use]
    pub fn is_owner_only(&self) -> bool {
        self.owner_only
    }

    /// Whether this is a command (as opposed to an event handler).
    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self.trigger, Trigger::Command)
    }

    /// Whether the leaf accepts updates.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Accept updates again.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Stop accepting updates without unregistering.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// How many times the handler has been invoked.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Count one invocation, returning the new total.
    pub fn record_call(&self) -> u64 {
        let previous = self
            .calls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_add(1))
            })
            .unwrap_or(u64::MAX);
        previous.saturating_add(1)
    }

    /// The handler invoked for accepted updates.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Check the trigger against an update.
    ///
    /// Returns the parsed arguments when the update is accepted. Commands
    /// yield the tokens after the command word; event handlers yield an
    /// empty list.
    #[must_use]
    pub fn accept(&self, update: &Update) -> Option<Vec<String>> {
        match &self.trigger {
            Trigger::Event(filter) => filter.matches(update).then(Vec::new),
            Trigger::Command => {
                let mut tokens = update.text.split_whitespace();
                let first = tokens.next()?;
                let hit = self.prefixes.iter().any(|prefix| {
                    first
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest == self.body)
                });
                hit.then(|| tokens.map(str::to_string).collect())
            },
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("body", &self.body)
            .field("command", &self.is_command())
            .field("enabled", &self.is_enabled())
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_ctx| async { Ok(Flow::Handled) })
    }

    #[test]
    fn command_matches_prefix_and_body() {
        let reg = Registration::command("addons", noop());
        let args = reg.accept(&Update::outgoing(1, 1, ".addons enabled")).unwrap();
        assert_eq!(args, vec!["enabled".to_string()]);
        assert!(reg.accept(&Update::outgoing(1, 1, ".addon x")).is_none());
        assert!(reg.accept(&Update::outgoing(1, 1, "addons")).is_none());
        assert!(reg.accept(&Update::outgoing(1, 1, "")).is_none());
    }

    #[test]
    fn custom_prefixes_replace_default() {
        let reg = Registration::command("bot", noop()).with_prefixes(["/", "!"]);
        assert!(reg.accept(&Update::outgoing(1, 1, "/bot")).is_some());
        assert!(reg.accept(&Update::outgoing(1, 1, "!bot")).is_some());
        assert!(reg.accept(&Update::outgoing(1, 1, ".bot")).is_none());
    }

    #[test]
    fn event_filter_is_consulted() {
        let reg = Registration::event("plus", |u: &Update| u.text == "+", noop());
        assert!(!reg.is_command());
        assert_eq!(reg.accept(&Update::outgoing(1, 1, "+")), Some(vec![]));
        assert!(reg.accept(&Update::outgoing(1, 1, "-")).is_none());
    }

    #[test]
    fn counters_and_flags() {
        let reg = Registration::command("bot", noop())
            .with_description("Shows bot information")
            .with_arguments(["status"])
            .owner_only();
        assert_eq!(reg.record_call(), 1);
        assert_eq!(reg.record_call(), 2);
        assert_eq!(reg.call_count(), 2);
        assert!(reg.is_owner_only());
        assert_eq!(reg.description(), Some("Shows bot information"));
        assert_eq!(reg.arguments(), ["status".to_string()]);

        reg.disable();
        assert!(!reg.is_enabled());
        reg.enable();
        assert!(reg.is_enabled());
    }
}
