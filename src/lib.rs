//! Main-process side of a renderer bridge for Electron 'compatible' app
//! containers: named methods forwarded to platform host objects, and host
//! events published back as topics.

pub mod bridge;
pub mod common;
pub mod config;
pub mod electron;
pub mod error;
pub mod events;
pub mod host;
pub mod node;
pub mod rpc;
pub mod schema;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use env_logger::Env;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use electron::{Hosts, Modules};
pub use host::{HostError, HostObject, HostResult, SessionHost, WindowHost};
pub use rpc::{ChannelPublisher, Dispatcher, Invocation, Publication, Publisher};

/// Sets up `env_logger`; `LOG_LEVEL` and `LOG_STYLE` override the config.
/// Calling it again is harmless.
pub fn init_logging(config: &BridgeConfig) {
  let env = Env::default()
    .filter_or("LOG_LEVEL", config.log_filter())
    .write_style_or("LOG_STYLE", "always");
  let _ = env_logger::Builder::from_env(env).try_init();
}
