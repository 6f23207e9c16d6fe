//! Error types for the trace subsystem.
//!
//! Two families live here:
//!
//! - [`TraceError`] covers misuse of the [`TraceStore`](crate::TraceStore) itself.
//! - [`AgentError`] is payload data: the failure an agent step ran into, carried
//!   on an [`ActionStep`](crate::ActionStep) and rendered into the message stream.

use serde_json::{Value, json};

/// Result type alias for trace operations.
pub type Result<T> = std::result::Result<T, TraceError>;

/// Error type for trace store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TraceError {
    /// A positional insert targeted an index other than the system prompt slot.
    #[error("position should only be 0 for the system prompt, got {position}")]
    InvalidPosition {
        /// The rejected position.
        position: usize,
    },

    /// A step other than a system prompt targeted the system prompt slot.
    #[error("only a system prompt step may replace the head of the trace, got {kind}")]
    NotSystemPrompt {
        /// Kind of the rejected step.
        kind: &'static str,
    },
}

impl TraceError {
    /// Create an invalid position error.
    #[must_use]
    pub const fn invalid_position(position: usize) -> Self {
        Self::InvalidPosition { position }
    }

    /// Create a not-a-system-prompt error.
    #[must_use]
    pub const fn not_system_prompt(kind: &'static str) -> Self {
        Self::NotSystemPrompt { kind }
    }
}

/// An error raised by the agent loop while running a step.
///
/// The trace never fails because of these; they are recorded on the step and
/// replayed to the model so it can correct course.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AgentError {
    /// The model output could not be parsed.
    #[error("{0}")]
    Parsing(String),

    /// Executing the requested action failed.
    #[error("{0}")]
    Execution(String),

    /// The run hit its step limit.
    #[error("{0}")]
    MaxSteps(String),

    /// The model failed to produce an output.
    #[error("{0}")]
    Generation(String),

    /// A tool call was malformed or referenced an unknown tool.
    #[error("{0}")]
    ToolCall(String),

    /// A tool failed while executing.
    #[error("{0}")]
    ToolExecution(String),
}

impl AgentError {
    /// Create a parsing error.
    #[must_use]
    pub fn parsing(msg: impl Into<String>) -> Self {
        Self::Parsing(msg.into())
    }

    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a max steps error.
    #[must_use]
    pub fn max_steps(msg: impl Into<String>) -> Self {
        Self::MaxSteps(msg.into())
    }

    /// Create a generation error.
    #[must_use]
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a tool call error.
    #[must_use]
    pub fn tool_call(msg: impl Into<String>) -> Self {
        Self::ToolCall(msg.into())
    }

    /// Create a tool execution error.
    #[must_use]
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Name of the error kind, as exported under the `type` key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parsing(_) => "AgentParsingError",
            Self::Execution(_) => "AgentExecutionError",
            Self::MaxSteps(_) => "AgentMaxStepsError",
            Self::Generation(_) => "AgentGenerationError",
            Self::ToolCall(_) => "AgentToolCallError",
            Self::ToolExecution(_) => "AgentToolExecutionError",
        }
    }

    /// Human-readable error text.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Export as `{"type": .., "message": ..}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind(),
            "message": self.describe(),
        })
    }
}
