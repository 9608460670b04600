//! AlertSink adapters.
//!
//! - `TracingAlertSink` - emits each alert as a log event (headless client)
//! - `InMemoryAlertSink` - records alerts for test assertions

mod in_memory;
mod tracing_sink;

pub use in_memory::InMemoryAlertSink;
pub use tracing_sink::TracingAlertSink;
