//! Composable dispatch tree for the Genesis addon runtime.
//!
//! Provides the building blocks the runtime attaches addons into:
//!
//! - [`DispatchNode`]: holder of leaf registrations and child nodes, with an
//!   `enabled` flag that hides its subtree from dispatch without detaching it
//! - [`Registration`]: a command or event handler with its own flag and
//!   call counter
//! - [`flatten`] / [`flatten_active`]: iterative tree traversal
//! - [`Dispatcher`]: routes an [`Update`] to the first accepting leaf
//! - [`StatisticsAggregator`]: tree-wide call totals and top-N rankings
//!
//! # Two roots
//!
//! The runtime keeps one root of [`NodeKind::Command`] and one of
//! [`NodeKind::Event`]. Nodes of different kinds never mix.
//!
//! # Concurrency
//!
//! Every node guards its lists with its own lock and hands out snapshots.
//! A traversal that starts just before a detach may still see the removed
//! subtree once; it never sees a node twice.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod prelude;
pub mod registration;
pub mod stats;

pub use context::{HandlerContext, MessageRef, Messenger, RepliedMessage, Update};
pub use dispatcher::{Dispatcher, ErrorHook};
pub use error::{DispatchError, DispatchResult};
pub use node::{DispatchNode, NodeId, NodeKind, NodeOwner, flatten, flatten_active};
pub use registration::{DEFAULT_PREFIX, Filter, Flow, Handler, Registration, handler_fn};
pub use stats::{StatRecord, StatisticsAggregator};
