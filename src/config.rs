//! Pool runtime configuration.

/// Tuning knobs for a [`Pool`](crate::pool::Pool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of concurrently live child instances.
    ///
    /// `0` means unlimited: every submitted item spawns immediately.
    pub threshold: usize,

    /// Scope segment prefixed onto forwarded child events and pool
    /// notifications (`"<scope>.threshold"`, `"<scope>.quiet"`, ...).
    ///
    /// Must be a single non-empty segment without dots; anything else falls
    /// back to the default.
    pub scope: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threshold: 4,
            scope: "worker".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Resolves the threshold sentinel: `0` means unlimited.
    pub fn limit(threshold: usize) -> Option<usize> {
        (threshold != 0).then_some(threshold)
    }

    /// Concurrency limit with the sentinel resolved (`0` → `None`).
    pub fn concurrency_limit(&self) -> Option<usize> {
        Self::limit(self.threshold)
    }

    /// Scope segment, clamped to a valid single segment.
    pub fn scope(&self) -> &str {
        if self.scope.is_empty() || self.scope.contains('.') {
            "worker"
        } else {
            &self.scope
        }
    }
}
