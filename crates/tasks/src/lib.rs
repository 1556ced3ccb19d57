//! Task model, persistence, and the idempotent action dispatcher.
//!
//! Inline button presses arrive at least once, so `complete`/`delete` are
//! applied as conditional single-statement writes and report `NoOp` instead
//! of erroring when the task is already resolved.

pub mod dispatch;
pub mod error;
pub mod store;
pub mod task;

pub use {
    dispatch::{ActionOutcome, Dispatcher, TaskAction},
    error::{Error, Result},
    store::{SqliteTaskStore, TaskStore},
    task::{Attachment, NewTask, Task},
};
