//! Typed interface to the external workflow engine.
//!
//! Input parameters arrive through four named scopes checked in priority
//! order; results go back as an object-scoped output map plus a
//! control-flow outcome. Both sides are plain serializable values so the
//! external engine can persist them between invocations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{SyncError, SyncResult};

/// The four parameter scopes the workflow engine exposes, in priority
/// order: current step, current object, root/request, persisted
/// cross-step state. The first scope holding a non-empty value wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Current step scope.
    #[serde(default)]
    pub step: HashMap<String, Value>,
    /// Current object scope.
    #[serde(default)]
    pub object: HashMap<String, Value>,
    /// Root/request scope.
    #[serde(default)]
    pub root: HashMap<String, Value>,
    /// Cross-step state persisted by the engine.
    #[serde(default)]
    pub state: HashMap<String, Value>,
}

/// Null, empty strings, and empty collections all count as "not set";
/// the original parameter-passing convention treats them interchangeably.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a parameter, checking all four scopes in priority order.
    pub fn resolve(&self, parameter: &str) -> Option<&Value> {
        [&self.step, &self.object, &self.root, &self.state]
            .into_iter()
            .filter_map(|scope| scope.get(parameter))
            .find(|v| !is_empty_value(v))
    }

    /// Resolve a parameter that must be present.
    pub fn require(&self, parameter: &str) -> SyncResult<&Value> {
        self.resolve(parameter)
            .ok_or_else(|| SyncError::missing_parameter(parameter))
    }

    /// Resolve a string parameter.
    pub fn resolve_str(&self, parameter: &str) -> Option<&str> {
        self.resolve(parameter).and_then(Value::as_str)
    }

    /// Resolve a string parameter that must be present.
    pub fn require_str(&self, parameter: &str) -> SyncResult<&str> {
        self.require(parameter)?
            .as_str()
            .ok_or_else(|| SyncError::missing_parameter(parameter))
    }
}

/// Object-scoped outputs written back to the workflow engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectOutputs {
    #[serde(flatten)]
    values: HashMap<String, Value>,
}

impl ObjectOutputs {
    /// Create an empty output map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Get an output value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check if no outputs have been written.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Control-flow signal returned to the workflow engine at the end of a
/// unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Proceed to the next step.
    Continue,
    /// Suspend and re-invoke this step after a delay. Not an error:
    /// used for cooperative waits such as directory replication lag.
    RetryAfter { delay_secs: u64, reason: String },
    /// Skip the remainder of this step.
    Skip,
    /// Abort the unit of work.
    Error { reason: String },
}

impl Outcome {
    /// Build an error outcome from an engine error, preserving the
    /// human-readable diagnostic.
    pub fn from_error(error: &SyncError) -> Self {
        Outcome::Error {
            reason: error.to_string(),
        }
    }

    /// The machine-readable result flag.
    pub fn result_flag(&self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::RetryAfter { .. } => "retry",
            Outcome::Skip => "skip",
            Outcome::Error { .. } => "error",
        }
    }

    /// The human-readable reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::RetryAfter { reason, .. } | Outcome::Error { reason } => Some(reason),
            Outcome::Continue | Outcome::Skip => None,
        }
    }
}
