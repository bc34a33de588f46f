//! Routing an update through a dispatch tree.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::context::{HandlerContext, Messenger, Update};
use crate::error::DispatchError;
use crate::node::{DispatchNode, flatten_active};
use crate::registration::{Flow, Registration};

/// Callback for handler failures. Failures never propagate past dispatch.
pub type ErrorHook = Arc<dyn Fn(&DispatchError, &Update) + Send + Sync>;

/// Walks the active part of a tree and hands the update to the first leaf
/// that accepts and handles it.
#[derive(Clone)]
pub struct Dispatcher {
    root: Arc<DispatchNode>,
    on_error: ErrorHook,
}

impl Dispatcher {
    /// Dispatch over `root`, logging handler failures.
    #[must_use]
    pub fn new(root: Arc<DispatchNode>) -> Self {
        Self {
            root,
            on_error: Arc::new(|error, update| {
                warn!(
                    chat_id = update.chat_id,
                    message_id = update.message_id,
                    error = %error,
                    "Handler failed"
                );
            }),
        }
    }

    /// Replace the failure callback.
    #[must_use]
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = hook;
        self
    }

    /// The tree this dispatcher walks.
    #[must_use]
    pub fn root(&self) -> &Arc<DispatchNode> {
        &self.root
    }

    /// Route one update.
    ///
    /// Leaves are tried in traversal order. A leaf is skipped when it is
    /// disabled, when it is owner-only and the update is not outgoing, or
    /// when its trigger rejects the update. The counter of an accepted leaf
    /// is bumped before its handler runs. Returns the leaf that consumed the
    /// update, if any; a failing handler also consumes it.
    pub async fn dispatch(
        &self,
        update: &Update,
        messenger: &Arc<dyn Messenger>,
    ) -> Option<Arc<Registration>> {
        for node in flatten_active(&self.root) {
            for registration in node.registrations() {
                if !registration.is_enabled() {
                    continue;
                }
                if registration.is_owner_only() && !update.outgoing {
                    continue;
                }
                let Some(arguments) = registration.accept(update) else {
                    continue;
                };

                registration.record_call();
                let ctx = HandlerContext::new(update.clone(), arguments, Arc::clone(messenger));
                match registration.handler().handle(&ctx).await {
                    Ok(Flow::Handled) => {
                        debug!(
                            leaf = registration.body(),
                            owner = %node.owner(),
                            "Update handled"
                        );
                        return Some(registration);
                    },
                    Ok(Flow::Skip) => {
                        trace!(leaf = registration.body(), "Handler skipped update");
                    },
                    Err(e) => {
                        (self.on_error)(&e, update);
                        return Some(registration);
                    },
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
