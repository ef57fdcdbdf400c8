//! Bounded, closable hand-off queue for batch fid sequences.
//!
//! The queue decouples the threads that partition a pass into batches from
//! the training workers that consume them. A single producer writes every
//! batch (usually in one bulk call) and closes the channel; any number of
//! receivers then drain it, each item going to exactly one receiver.

pub mod error;
pub mod spmc;

pub use error::{CloseError, RecvError, SendError, TryRecvError, TrySendError};
