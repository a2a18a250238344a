//! # Runtime events dispatched through a machine's action table.
//!
//! An [`Event`] pairs a hierarchical name with optional metadata:
//! - `payload`: the value carried by the event (a work result, an injected
//!   value, an operation's success result);
//! - `op_args`: for operation completions, the original argument bundle that
//!   was handed to the provider, echoed back so completion handlers can
//!   correlate;
//! - `error`: for `.err` completions, the operation failure.
//!
//! Synthetic events (`tick`, pool `threshold`/`quiet` notifications) carry no
//! payload.

use crate::error::OpError;

use super::name::EventName;

/// One occurrence routed through the matcher, with builder-style metadata.
#[derive(Debug, Clone)]
pub struct Event<P> {
    name: EventName,
    payload: Option<P>,
    op_args: Option<P>,
    error: Option<OpError>,
}

impl<P> Event<P> {
    /// Creates a bare event with the given name.
    pub fn new(name: EventName) -> Self {
        Self {
            name,
            payload: None,
            op_args: None,
            error: None,
        }
    }

    /// Attaches a payload. Accepts a value or an `Option` directly.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Option<P>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Attaches the echoed operation arguments.
    #[inline]
    pub fn with_op_args(mut self, args: impl Into<Option<P>>) -> Self {
        self.op_args = args.into();
        self
    }

    /// Attaches an operation failure.
    #[inline]
    pub fn with_error(mut self, error: OpError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn name(&self) -> &EventName {
        &self.name
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    pub fn op_args(&self) -> Option<&P> {
        self.op_args.as_ref()
    }

    pub fn error(&self) -> Option<&OpError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accepts_values_and_options() {
        let name = EventName::new("fs.lstat.done").unwrap();
        let ev = Event::new(name.clone())
            .with_payload("stat")
            .with_op_args(Some("path"));
        assert_eq!(ev.name(), &name);
        assert_eq!(ev.payload(), Some(&"stat"));
        assert_eq!(ev.op_args(), Some(&"path"));
        assert!(ev.error().is_none());

        let bare: Event<&str> = Event::new(EventName::tick()).with_payload(None);
        assert!(bare.payload().is_none());
    }

    #[test]
    fn test_error_completion() {
        let ev: Event<()> = Event::new(EventName::new("fs.readdir.err").unwrap())
            .with_error(OpError::new("permission denied"));
        assert_eq!(ev.error().unwrap().message, "permission denied");
    }
}
