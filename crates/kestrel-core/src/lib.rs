//! Concurrency primitives shared by the rest of the workspace: a
//! closable, optionally-rendezvous channel and a panic-contained worker
//! pool built on top of it.

mod channel;
mod error;
mod pool;

pub use channel::Channel;
pub use error::Error;
pub use pool::TaskPool;
