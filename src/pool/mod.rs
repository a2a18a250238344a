//! Threshold-bounded actor pools: a controller machine, its children, and
//! the command handle between them.

mod controller;
mod handle;

pub use controller::Pool;
pub use handle::PoolHandle;
