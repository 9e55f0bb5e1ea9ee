//! Background queues for Solace.
//!
//! - [`command_queue`]: one worker per queue that applies inter-agent
//!   commands strictly in order, with explicit `start` / `drain` / `stop`
//! - [`board`]: the default command handler, a TTL'd coordination board
//! - [`feedback`]: feedback writes with exponential backoff and a periodic
//!   retry queue for writes that keep failing

pub mod board;
pub mod command_queue;
pub mod feedback;

pub use board::{BoardEntry, CoordinationBoard};
pub use command_queue::{
    Command, CommandHandler, CommandPayload, CommandQueue, CommandQueueHandle, Priority, QueueStats,
};
pub use feedback::{FeedbackOutcome, FeedbackRetryQueue, RetryPolicy};
