//! oaiharvest core - common infrastructure for the OAI-PMH harvester
//!
//! Shared HTTP plumbing, durable output sinks, logging, progress display
//! and shutdown signalling used by the protocol and CLI crates.

pub mod http;
pub mod logging;
pub mod progress;
pub mod shutdown;
pub mod sink;

// Re-exports for convenience
pub use http::{HttpError, SHARED_RUNTIME, get_with_retry, http_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::ProgressContext;
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};
pub use sink::{Sink, open_sink};
