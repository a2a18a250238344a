//! Declarative state graphs: state definitions, transition directives, and
//! the validated chart they compile into.

#[allow(clippy::module_inception)]
mod chart;
mod state;
mod transition;

pub use chart::{Chart, ChartBuilder};
pub use state::{ArgsFn, Fire, GuardFn, HookFn, StateDef, StateName, WorkFn};
pub use transition::{Action, ActionFn, Redirect, Step};

pub(crate) use state::{Body, CompiledState};
pub(crate) use transition::resolve;
