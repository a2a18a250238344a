//! Actor instances and the execution loop that drives them.

mod executor;
#[allow(clippy::module_inception)]
mod machine;

pub use machine::{Machine, MachineExit, MachineHandle, MachineId};
