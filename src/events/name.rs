//! # Hierarchical event names.
//!
//! An [`EventName`] is an ordered, non-empty sequence of string segments,
//! rendered dot-joined (`"fs.readdir.done"`). Names are validated once at
//! construction and cheap to clone afterwards.
//!
//! ## Rules
//! - At least one segment; no segment may be empty (`"a..b"` is rejected).
//! - Two names are equal iff their segment sequences are equal, which for a
//!   dot-joined rendering is plain textual equality.

use std::fmt;
use std::sync::Arc;

use crate::error::NameError;

/// Dot-segmented identifier describing an occurrence routed through the
/// matcher.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EventName(Arc<str>);

impl EventName {
    /// Validates and builds an event name.
    pub fn new(text: impl AsRef<str>) -> Result<Self, NameError> {
        let text = text.as_ref();
        if text.is_empty() {
            return Err(NameError::Empty);
        }
        if text.split('.').any(str::is_empty) {
            return Err(NameError::EmptySegment(text.to_string()));
        }
        Ok(Self(Arc::from(text)))
    }

    /// The synthetic timer event injected by a state's ticker.
    pub fn tick() -> Self {
        Self(Arc::from("tick"))
    }

    /// Single pre-validated segment; callers clamp first.
    pub(crate) fn segment(text: &str) -> Self {
        debug_assert!(!text.is_empty() && !text.contains('.'));
        Self(Arc::from(text))
    }

    /// Appends one segment: `"fs.readdir".with_suffix("done")` →
    /// `"fs.readdir.done"`. Used for operation completion tags.
    pub fn with_suffix(&self, segment: &str) -> Self {
        debug_assert!(!segment.is_empty() && !segment.contains('.'));
        Self(Arc::from(format!("{}.{segment}", self.0)))
    }

    /// Prepends a scope: `"addDir".prefixed("processor")` →
    /// `"processor.addDir"`. Used by the pool when forwarding child events.
    pub fn prefixed(&self, scope: &str) -> Self {
        debug_assert!(!scope.is_empty() && !scope.contains('.'));
        Self(Arc::from(format!("{scope}.{}", self.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the name's segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventName({})", self.0)
    }
}
