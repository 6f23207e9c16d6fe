//! Step records for an agent run and their projection into messages.
//!
//! A run is recorded as an ordered list of [`Step`]s:
//!
//! - **[`SystemPromptStep`]** - the prompt the run opens with
//! - **[`TaskStep`]** - a task (or re-injected sub-task) given to the agent
//! - **[`PlanningStep`]** - facts and plan from a planning cycle
//! - **[`ActionStep`]** - one reasoning/acting cycle, filled in as it runs
//!
//! Each step projects itself into zero or more [`Message`](crate::Message)s
//! under a [`ProjectionMode`](crate::ProjectionMode).
//!
//! # Example
//!
//! ```rust,ignore
//! use steptrace::{ActionStep, ProjectionMode, ToolCall};
//!
//! let mut step = ActionStep::new(1);
//! step.record_tool_calls(vec![ToolCall::new("c1", "search", serde_json::json!({}))]);
//! step.record_observations("3 results");
//! step.finish();
//!
//! let messages = step.to_messages(ProjectionMode::full());
//! ```

mod steps;
mod timing;
mod types;

pub use steps::{ActionStep, PlanningStep, Step, SystemPromptStep, TaskStep};
pub use timing::Timing;
pub use types::ToolCall;
