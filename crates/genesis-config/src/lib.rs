//! Genesis Config - layered configuration for the Genesis addon runtime.
//!
//! Configuration lives in `genesis.toml`:
//!
//! ```toml
//! [main]
//! name = "Genesis"
//! accounts_count = 1
//! sessions_root = "sessions"
//!
//! [addons]
//! root = "addons"
//! watch = true
//! debounce_ms = 500
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```
//!
//! Missing keys come from embedded defaults. `GENESIS_*` environment
//! variables fill in fields the file left unset.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{DEFAULT_CONFIG_FILE, default_config, load, load_with_env};
pub use types::{AddonsConfig, Config, MainConfig};
pub use validate::validate;
