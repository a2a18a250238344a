//! # Chart: a validated, immutable state graph.
//!
//! Built once through [`ChartBuilder`], then shared across any number of
//! machine instances behind an `Arc`. Validation happens here so that
//! programmer errors (duplicate states, dangling literal transitions,
//! malformed patterns or operation names) are fatal at startup instead of
//! surfacing mid-run.

use std::collections::HashMap;
use std::fmt;

use crate::error::ChartError;

use super::state::{CompileError, CompiledState, StateDef, StateName};
use super::transition::Action;

/// Immutable state graph plus its start state.
pub struct Chart<C, P> {
    start: StateName,
    states: HashMap<StateName, CompiledState<C, P>>,
}

impl<C, P: Clone> Chart<C, P> {
    /// Starts building a chart that begins in `start`.
    pub fn builder(start: impl Into<StateName>) -> ChartBuilder<C, P> {
        ChartBuilder {
            start: start.into(),
            states: Vec::new(),
        }
    }
}

impl<C, P> Chart<C, P> {
    pub fn start(&self) -> &StateName {
        &self.start
    }

    pub(crate) fn state(&self, name: &str) -> Option<&CompiledState<C, P>> {
        self.states.get(name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// States hold closures, so this cannot be derived; the compact form is what
// test assertions and log lines want anyway.
impl<C, P> fmt::Debug for Chart<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chart")
            .field("start", &self.start)
            .field("states", &self.states.len())
            .finish_non_exhaustive()
    }
}

/// Collects state definitions and validates them into a [`Chart`].
pub struct ChartBuilder<C, P> {
    start: StateName,
    states: Vec<StateDef<C, P>>,
}

impl<C, P: Clone> ChartBuilder<C, P> {
    /// Adds one state definition.
    pub fn state(mut self, def: StateDef<C, P>) -> Self {
        self.states.push(def);
        self
    }

    /// Validates and freezes the chart.
    pub fn build(self) -> Result<Chart<C, P>, ChartError> {
        if self.states.is_empty() {
            return Err(ChartError::Empty);
        }

        let mut states: HashMap<StateName, CompiledState<C, P>> =
            HashMap::with_capacity(self.states.len());
        for def in self.states {
            let name = def.name.clone();
            let compiled = def.compile().map_err(|err| match err {
                CompileError::OpName(source) => ChartError::BadOpName {
                    state: name.to_string(),
                    source,
                },
                CompileError::Pattern { text, source } => ChartError::BadPattern {
                    state: name.to_string(),
                    pattern: text,
                    source,
                },
            })?;
            if states.insert(name.clone(), compiled).is_some() {
                return Err(ChartError::DuplicateState(name.to_string()));
            }
        }

        if !states.contains_key(&*self.start) {
            return Err(ChartError::UnknownStart(self.start.to_string()));
        }

        // Literal routes can be checked statically; computed actions are the
        // executor's problem.
        for state in states.values() {
            for (pattern, action) in &state.table {
                if let Action::Goto(target) = action {
                    if !states.contains_key(&**target) {
                        return Err(ChartError::UnknownTarget {
                            state: state.name.to_string(),
                            pattern: pattern.text().to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        Ok(Chart {
            start: self.start,
            states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestChart = Chart<(), String>;

    #[test]
    fn test_minimal_chart_builds() {
        let chart: TestChart = Chart::builder("Idle")
            .state(StateDef::new("Idle").route("", Action::Exit))
            .build()
            .unwrap();
        assert_eq!(&**chart.start(), "Idle");
        assert_eq!(chart.len(), 1);
    }

    #[test]
    fn test_chart_debug_names_start_and_state_count() {
        let chart: TestChart = Chart::builder("Idle")
            .state(StateDef::new("Idle").route("", Action::Exit))
            .build()
            .unwrap();
        let rendered = format!("{chart:?}");
        assert!(rendered.contains("Idle"));
        assert!(rendered.contains("states: 1"));
    }

    #[test]
    fn test_empty_chart_rejected() {
        let err = Chart::<(), String>::builder("Idle").build().unwrap_err();
        assert!(matches!(err, ChartError::Empty));
    }

    #[test]
    fn test_unknown_start_rejected() {
        let err = Chart::<(), String>::builder("Missing")
            .state(StateDef::new("Idle"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChartError::UnknownStart(s) if s == "Missing"));
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let err = Chart::<(), String>::builder("Idle")
            .state(StateDef::new("Idle"))
            .state(StateDef::new("Idle"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChartError::DuplicateState(s) if s == "Idle"));
    }

    #[test]
    fn test_dangling_literal_target_rejected() {
        let err = Chart::<(), String>::builder("Idle")
            .state(StateDef::new("Idle").to(".done", "Nowhere"))
            .build()
            .unwrap_err();
        match err {
            ChartError::UnknownTarget {
                state,
                pattern,
                target,
            } => {
                assert_eq!(state, "Idle");
                assert_eq!(pattern, ".done");
                assert_eq!(target, "Nowhere");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = Chart::<(), String>::builder("Idle")
            .state(StateDef::new("Idle").route("a..b", Action::Stay))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChartError::BadPattern { pattern, .. } if pattern == "a..b"));
    }

    #[test]
    fn test_bad_op_name_rejected() {
        let err = Chart::<(), String>::builder("Read")
            .state(StateDef::new("Read").op("fs..readdir"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChartError::BadOpName { state, .. } if state == "Read"));
    }
}
