//! Conversion orchestration.
//!
//! The [`ConversionDispatcher`] turns idle queue records into independent
//! [`ConversionTask`]s against the shared transcoding engine:
//!
//! - one task per record, spawned on the tokio runtime
//! - engine invocations bounded by a semaphore
//! - progress and outcomes applied back to the record by id, so results of
//!   discarded records are dropped
//! - a failure marks only its own record as `Error`

mod dispatcher;
mod task;

pub use dispatcher::ConversionDispatcher;
pub use task::{ConversionTask, CANCELLED_REASON};
