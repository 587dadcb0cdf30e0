/// Errors produced by the channel and task-pool primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A send was attempted on a channel that has been closed.
    #[error("send on closed channel")]
    ClosedChannel,

    /// A non-blocking (`try_*`) call could not complete immediately.
    #[error("operation would block")]
    WouldBlock,

    /// A task panicked inside a pool worker. The panic is contained to the
    /// worker thread and reported here rather than propagated.
    #[error("task panicked: {0}")]
    TaskPanic(String),

    /// A task was submitted to a pool that has already been shut down.
    #[error("task pool is shut down")]
    PoolShutdown,
}
