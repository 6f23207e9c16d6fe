#![cfg_attr(docsrs, feature(doc_cfg))]
//! Steptrace records the execution trace of an autonomous agent run and
//! replays it as a conversational message history.
//!
//! The agent loop appends [`Step`]s to a [`TraceStore`]. At output time the
//! store projects each step, in order, into role-tagged [`Message`]s under a
//! [`ProjectionMode`]: full or summarized, with or without memory echo. The
//! same sequence feeds the [`replay`] renderer for human-readable display.
//!
//! # Example
//!
//! ```rust,ignore
//! use steptrace::{ActionStep, SystemPromptStep, TaskStep, TraceStore};
//!
//! let mut trace = TraceStore::new();
//! trace.append(SystemPromptStep::new("You are a helpful agent."));
//! trace.append(TaskStep::new("What is 2 + 2?"));
//!
//! let mut step = ActionStep::new(1);
//! step.record_llm_output("The answer is 4.");
//! step.finish();
//! trace.append(step);
//!
//! let history = trace.project_all(false, false);
//! trace.replay(false);
//! ```

pub mod config;
pub mod error;
pub mod json;
pub mod message;
pub mod metrics;
pub mod output;
pub mod replay;
pub mod step;
pub mod store;

pub use config::{LogLevel, TraceConfig};
pub use error::{AgentError, Result, TraceError};
pub use message::{ContentPart, ImageRef, Message, MessageContent, ProjectionMode, Role};
pub use metrics::TraceMetrics;
pub use output::{ModelOutput, TokenUsage};
pub use replay::{RenderRequest, ReplaySink, Theme, TracingSink};
pub use step::{ActionStep, PlanningStep, Step, SystemPromptStep, TaskStep, Timing, ToolCall};
pub use store::{TraceExport, TraceStore};
