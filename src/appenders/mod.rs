//! Stream implementations

pub mod console;
pub mod environment;
pub mod json;
pub mod memory;
pub mod server;
pub mod transport;

#[cfg(feature = "console")]
pub use console::ConsoleFormattedStream;
pub use console::{ConsolePlainStream, ConsoleRawStream};
pub use environment::{is_bot, Environment, StaticEnvironment, NO_WINDOW_USER_AGENT};
pub use json::JsonLinesStream;
pub use memory::MemoryStream;
pub use server::{ErrorCallback, ServerStream, ServerStreamBuilder, ServerStreamConfig, WriteCondition};
#[cfg(feature = "network")]
pub use transport::HttpTransport;
pub use transport::{BeaconTransport, DeliveryFailure, Transport, TransportRequest, TransportResponse};

// Re-export the stream trait alongside its implementations
pub use crate::core::LogStream;
