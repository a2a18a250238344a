//! Error types used by the statevisor runtime.
//!
//! Three layers, mirroring where a failure can occur:
//!
//! - [`ChartError`] — programmer errors in a state graph, caught when the
//!   chart is built. Fatal to startup.
//! - [`MachineError`] — fatal-to-one-instance conditions (unhandled event,
//!   transition into an undefined state, explicit fault route). Carried in
//!   [`MachineExit::Faulted`](crate::MachineExit::Faulted) and reported to the
//!   owner, never thrown across instance boundaries.
//! - [`OpError`] — failure of an external asynchronous operation. Recoverable
//!   by design: it is delivered as a `.err` completion event and routed
//!   through the state's action table like any other event.
//!
//! [`PoolError`] wraps the terminal conditions of a pool run.

use thiserror::Error;

/// Rejected event-name text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Event names must have at least one segment.
    #[error("event name is empty")]
    Empty,

    /// A dot-joined name such as `"a..b"` or `".a"` has a hole in it.
    #[error("event name '{0}' has an empty segment")]
    EmptySegment(String),
}

/// Rejected action-table pattern text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A non-wildcard pattern such as `"a..b"` or `"."` has an empty segment.
    #[error("pattern has an empty segment")]
    EmptySegment,
}

/// Malformed state graph, detected when the chart is built.
///
/// These are programmer errors; a chart that builds successfully can only
/// fail at runtime through [`MachineError`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChartError {
    /// The builder was given no states at all.
    #[error("chart has no states")]
    Empty,

    /// The declared start state is not among the registered states.
    #[error("start state '{0}' is not defined")]
    UnknownStart(String),

    /// Two states share a name.
    #[error("state '{0}' is defined twice")]
    DuplicateState(String),

    /// A literal transition names a state that does not exist.
    ///
    /// Only literal routes can be checked here; computed actions are
    /// validated at dispatch time and surface as
    /// [`MachineError::UnknownState`].
    #[error("state '{state}' routes '{pattern}' to undefined state '{target}'")]
    UnknownTarget {
        state: String,
        pattern: String,
        target: String,
    },

    /// An action-table key failed to parse.
    #[error("state '{state}' has invalid pattern '{pattern}': {source}")]
    BadPattern {
        state: String,
        pattern: String,
        source: PatternError,
    },

    /// An asynchronous-operation descriptor has an invalid name.
    #[error("state '{state}' has an invalid operation name: {source}")]
    BadOpName { state: String, source: NameError },
}

/// Fatal condition for a single machine instance.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// The matcher found neither a matching pattern nor a wildcard.
    ///
    /// The instance cannot proceed safely; the event is reported, not
    /// silently dropped.
    #[error("state '{state}' has no action matching event '{event}'")]
    UnhandledEvent { state: String, event: String },

    /// A computed action transitioned into a state the chart does not define.
    #[error("state '{state}' transitioned into undefined state '{target}'")]
    UnknownState { state: String, target: String },

    /// An explicit fault route, or a handler-produced fault.
    #[error("state '{state}' faulted: {reason}")]
    Faulted { state: String, reason: String },
}

impl MachineError {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            MachineError::UnhandledEvent { .. } => "machine_unhandled_event",
            MachineError::UnknownState { .. } => "machine_unknown_state",
            MachineError::Faulted { .. } => "machine_faulted",
        }
    }
}

/// Failure payload of an external asynchronous operation.
///
/// Carried on `.err` completion events together with the echoed arguments of
/// the operation, so completion handlers can correlate the failure with what
/// was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OpError {
    /// Human-readable failure description.
    pub message: String,
}

impl OpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal conditions of a pool run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool's controller chart hit a fatal condition.
    #[error("pool controller faulted: {0}")]
    Controller(MachineError),

    /// The controller task panicked.
    #[error("pool controller panicked")]
    ControllerPanicked,

    /// The pool was cancelled before the controller finished.
    #[error("pool was cancelled before quiescence")]
    Cancelled,
}

/// The pool's command channel is gone; the pool has already terminated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pool command channel is closed")]
pub struct PoolClosed;
