pub mod dispatcher;
pub mod idempotency;
pub mod sinks;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig, ProcessOutcome};
pub use idempotency::{BoundedIdCache, IdempotencyGuard};
pub use sinks::TracingAuditSink;
