// src/error.rs

use core::fmt;

/// Error returned by `try_send` when the item could not be queued
/// immediately. The item is handed back to the caller.
#[derive(PartialEq, Eq, Clone)]
pub enum TrySendError<T> {
  /// The queue is at capacity.
  Full(T),
  /// Every receiver has been dropped or closed.
  Closed(T),
}

impl<T> TrySendError<T> {
  /// Consumes the error, returning the item that could not be sent.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TrySendError::Full(v) | TrySendError::Closed(v) => v,
    }
  }
}

impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
      TrySendError::Closed(_) => write!(f, "TrySendError::Closed(..)"),
    }
  }
}

impl<T> fmt::Display for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => f.write_str("channel full"),
      TrySendError::Closed(_) => f.write_str("channel closed"),
    }
  }
}

impl<T> std::error::Error for TrySendError<T> {}

/// Error returned by blocking send operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// Every receiver has been dropped or closed, or this sender was closed.
  Closed,
}
impl std::error::Error for SendError {}
impl fmt::Display for SendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendError::Closed => write!(f, "channel closed"),
    }
  }
}

/// Error returned by `try_recv` when no item could be taken immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// The queue is empty but the sender is still open.
  Empty,
  /// The queue is empty and the sender has been closed.
  Disconnected,
}
impl std::error::Error for TryRecvError {}
impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => write!(f, "channel empty"),
      TryRecvError::Disconnected => write!(f, "channel disconnected (empty and sender closed)"),
    }
  }
}

/// Error returned by blocking `recv` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// The queue is drained and the sender has been closed.
  Disconnected,
}
impl std::error::Error for RecvError {}
impl fmt::Display for RecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvError::Disconnected => write!(f, "channel disconnected (empty and sender closed)"),
    }
  }
}

/// Error returned when attempting to close an already closed handle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CloseError;
impl std::error::Error for CloseError {}
impl fmt::Display for CloseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "channel is already closed")
  }
}
