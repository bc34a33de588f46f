//! Prelude module - commonly used types for convenient import.
//!
//! Use `use genesis_dispatch::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use genesis_dispatch::prelude::*;
//!
//! let root = DispatchNode::root(NodeKind::Command);
//! let addon = DispatchNode::new(NodeKind::Command, NodeOwner::addon("weather"));
//! addon.register(Registration::command(
//!     "forecast",
//!     handler_fn(|ctx| async move {
//!         ctx.reply("sunny").await?;
//!         Ok(Flow::Handled)
//!     }),
//! ));
//!
//! root.include(&addon).unwrap();
//! assert_eq!(flatten(&root).len(), 2);
//! ```

// Tree
pub use crate::{DispatchNode, NodeKind, NodeOwner, flatten, flatten_active};

// Leaves
pub use crate::{Flow, Handler, Registration, handler_fn};

// Routing
pub use crate::{Dispatcher, HandlerContext, Messenger, Update};

// Statistics
pub use crate::StatisticsAggregator;

// Errors
pub use crate::{DispatchError, DispatchResult};
