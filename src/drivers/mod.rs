//! # Drivers
//!
//! Concrete implementations of the [`Driver`](crate::Driver) traits.
//!
//! | Driver | Storage |
//! |--------|---------|
//! | [`MemoryDriver`] | In-process map; for tests and ephemeral data |
//! | [`LocalDriver`] | Host filesystem through `tokio::fs` |

mod local;
mod memory;

pub use local::LocalDriver;
pub use memory::MemoryDriver;
