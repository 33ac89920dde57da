//! # Driver Traits
//!
//! The boundary between this layer and the native storage driver.
//!
//! ## Trait Layers
//!
//! ```text
//! DriverEntries + DriverHandles + DriverEnv = Driver
//! ```
//!
//! | Trait | Covers |
//! |-------|--------|
//! | [`DriverEntries`] | `exists`, `stat`, `mkdir`, `touch`, `remove`, `rename`, `copy`, `read_dir` |
//! | [`DriverHandles`] | `open`, `close`, `tell`, `seek`, `truncate`, `read`, `write` |
//! | [`DriverEnv`] | `home_dir`, `temp_dir` |
//!
//! ## Blanket Implementation
//!
//! [`Driver`] is implemented for every type implementing the three
//! component traits. Implement the components and you get `Driver` for free.
//!
//! ## Futures
//!
//! Methods return `impl Future + Send`. Implementations are free to write
//! them as `async fn`; the future just has to be `Send` so handle queues can
//! run it on their worker task.

mod driver_entries;
mod driver_env;
mod driver_handles;

pub use driver_entries::DriverEntries;
pub use driver_env::DriverEnv;
pub use driver_handles::DriverHandles;

/// A complete storage driver.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing [`DriverEntries`],
/// [`DriverHandles`] and [`DriverEnv`]. You never need to implement
/// `Driver` directly.
pub trait Driver: DriverEntries + DriverHandles + DriverEnv + 'static {}

impl<T: DriverEntries + DriverHandles + DriverEnv + 'static> Driver for T {}
