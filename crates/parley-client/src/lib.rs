//! # parley-client
//!
//! The simulated messaging backend as seen from one client instance: account
//! directory, conversation ledgers, message delivery, the story feed, and the
//! session that ties them together.  Several instances sharing one store act
//! as several users on several devices.

pub mod attachments;
pub mod config;
pub mod delivery;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod reply;
pub mod session;
pub mod stories;

pub use config::ClientConfig;
pub use error::{ErrorKind, Result, ServiceError};
pub use session::SessionManager;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.  `RUST_LOG` overrides the default
/// filter.  Calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley_client=debug,parley_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
