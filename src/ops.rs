//! # Asynchronous-operation provider interface.
//!
//! The core is agnostic to what an operation name denotes (file read, network
//! call, process stat); it only needs the done/err contract. The executor
//! evaluates the state's argument producer, hands the bundle to the provider,
//! and suspends cooperatively until the outcome arrives. Completions are
//! dispatched as `<op>.done` / `<op>.err` events carrying the result or the
//! error, plus the original arguments echoed back.
//!
//! Cancellation is cooperative: a provider that wants to abort an operation
//! returns [`OpOutcome::Err`]; the core never retries on its own.

use async_trait::async_trait;

use crate::error::OpError;
use crate::events::EventName;

/// Result of one external operation.
#[derive(Debug, Clone)]
pub enum OpOutcome<P> {
    /// Success, with an optional result value.
    Done(Option<P>),
    /// Failure; routed through the state's `.err` actions.
    Err(OpError),
}

/// External collaborator that performs named asynchronous operations.
///
/// Implementations should honor cancellation of the returned future: the
/// executor drops it when an injected event transitions the state away while
/// the operation is in flight.
#[async_trait]
pub trait OpProvider<P>: Send + Sync {
    async fn invoke(&self, op: &EventName, args: Option<P>) -> OpOutcome<P>;
}

/// Provider for charts that declare no operation states.
///
/// Any invocation fails, which a well-formed chart will never trigger; if it
/// does, the `.err` route (or an unhandled-event fault) makes the
/// misconfiguration visible.
pub struct NullProvider;

#[async_trait]
impl<P: Send + 'static> OpProvider<P> for NullProvider {
    async fn invoke(&self, op: &EventName, _args: Option<P>) -> OpOutcome<P> {
        OpOutcome::Err(OpError::new(format!("no provider for operation '{op}'")))
    }
}
