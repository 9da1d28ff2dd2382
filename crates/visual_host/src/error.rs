use std::time::Duration;
use thiserror::Error;

/// Failure of a work item marshalled onto a dispatcher loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatcher has shut down and no longer accepts work")]
    ShutDown,

    #[error("dispatcher stopped before the work item ran")]
    Aborted,

    #[error("work item panicked: {0}")]
    Panicked(String),

    #[error("work item did not complete within {0:?}")]
    Timeout(Duration),

    #[error("waiting on the dispatcher's own thread would deadlock")]
    WouldDeadlock,
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to spawn hosted element thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

pub type Result<T> = std::result::Result<T, HostError>;
