//! Tiered race-and-fallback dispatcher
//!
//! - [`invoker`]: one bounded call to one model
//! - [`race`]: all candidates of a tier at once, first success wins
//! - [`escalator`]: tiers in order until one wins
//! - [`streaming`]: the same walk, committing on the first content chunk

pub mod error;
pub mod escalator;
pub mod invoker;
pub mod race;
pub mod streaming;

pub use error::{DispatchError, InvokeError, RaceFailure, BUSY_MESSAGE};
pub use escalator::{DispatchState, Dispatcher};
pub use invoker::{ChunkStream, ModelInvoker, Reply, StreamStart};
pub use streaming::{EventStream, StreamEvent};
