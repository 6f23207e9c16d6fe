//! The trace store: ordered steps plus raw model outputs for one run.
//!
//! [`TraceStore`] is owned by a single agent run and mutated only from its
//! sequential control flow. Concurrent runs each own their own store.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::{LogLevel, TraceConfig};
use crate::error::{Result, TraceError};
use crate::message::{Message, ProjectionMode};
use crate::metrics::TraceMetrics;
use crate::output::{ModelOutput, TokenUsage};
use crate::replay::{ReplaySink, TracingSink, render_replay};
use crate::step::{Step, SystemPromptStep};

const AGENT_MEMORY_KEY: &str = "agent_memory";

/// Complete JSON-safe snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceExport {
    /// Exported steps, in order.
    pub steps: Vec<Value>,
    /// Exported raw model outputs, in order.
    pub raw_outputs: Vec<Value>,
}

/// Ordered record of a run's steps and raw model outputs.
#[derive(Debug, Clone, Default)]
pub struct TraceStore {
    config: TraceConfig,
    steps: Vec<Step>,
    raw_outputs: Vec<ModelOutput>,
}

impl TraceStore {
    /// Create an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: TraceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Append a step to the end of the trace.
    pub fn append(&mut self, step: impl Into<Step>) {
        let step = step.into();
        debug!(kind = step.kind(), index = self.steps.len(), "step_recorded");
        self.steps.push(step);
    }

    /// Record a step, either appended or at a position.
    ///
    /// Only position `0` is accepted: it replaces the head of the trace and is
    /// reserved for the system prompt.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidPosition`] for any other position, and
    /// [`TraceError::NotSystemPrompt`] when a different step kind targets
    /// position `0`. The trace is unchanged on error.
    pub fn log_step(&mut self, step: impl Into<Step>, position: Option<usize>) -> Result<()> {
        let step = step.into();
        match (position, step) {
            (None, step) => {
                self.append(step);
                Ok(())
            }
            (Some(0), Step::SystemPrompt(prompt)) => {
                self.replace_system_prompt(prompt);
                Ok(())
            }
            (Some(0), step) => {
                error!(kind = step.kind(), "head_replacement_rejected");
                Err(TraceError::not_system_prompt(step.kind()))
            }
            (Some(position), _) => {
                error!(position, "invalid_step_position");
                Err(TraceError::invalid_position(position))
            }
        }
    }

    /// Replace the step at the head of the trace with a finalized system prompt.
    ///
    /// The rest of the trace is left untouched. On an empty trace the prompt
    /// becomes the only step.
    pub fn replace_system_prompt(&mut self, step: SystemPromptStep) {
        let step = Step::SystemPrompt(step);
        debug!(kind = step.kind(), "step_head_replaced");
        match self.steps.first_mut() {
            Some(head) => *head = step,
            None => self.steps.push(step),
        }
    }

    /// Drop all steps. Raw outputs are kept.
    pub fn reset(&mut self) {
        debug!(dropped = self.steps.len(), "trace_reset");
        self.steps.clear();
    }

    /// Record a raw model output for audit.
    pub fn record_raw_output(&mut self, output: ModelOutput) {
        self.raw_outputs.push(output);
    }

    /// Recorded steps, in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Recorded raw outputs, in order.
    #[must_use]
    pub fn raw_outputs(&self) -> &[ModelOutput] {
        &self.raw_outputs
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step exports with the `agent_memory` key removed.
    #[must_use]
    pub fn succinct_view(&self) -> Vec<Value> {
        self.steps
            .iter()
            .map(|step| {
                let mut value = step.to_value();
                if let Value::Object(map) = &mut value {
                    map.remove(AGENT_MEMORY_KEY);
                }
                value
            })
            .collect()
    }

    /// Complete snapshot of steps and raw outputs.
    #[must_use]
    pub fn full_export(&self) -> TraceExport {
        TraceExport {
            steps: self.steps.iter().map(Step::to_value).collect(),
            raw_outputs: self.raw_outputs.iter().map(ModelOutput::to_value).collect(),
        }
    }

    /// Project every step in order and concatenate the messages.
    #[must_use]
    pub fn project_all(&self, summary_mode: bool, include_memory: bool) -> Vec<Message> {
        let mode = ProjectionMode {
            summary_mode,
            include_memory,
        };
        self.steps
            .iter()
            .flat_map(|step| step.to_messages(mode))
            .collect()
    }

    /// Replay the trace as `info` events.
    pub fn replay(&self, include_memory: bool) {
        self.replay_into(&mut TracingSink, include_memory);
    }

    /// Replay the trace into a sink.
    pub fn replay_into<S: ReplaySink + ?Sized>(&self, sink: &mut S, include_memory: bool) {
        let messages = self.project_all(false, include_memory);
        info!(steps = self.steps.len(), messages = messages.len(), "replaying_steps");
        render_replay(&messages, sink);
    }

    /// Emit a message if `level` is within the configured verbosity.
    pub fn log(&self, level: LogLevel, message: impl Display) {
        if level > self.config.level {
            return;
        }
        match level {
            LogLevel::Error => error!("{message}"),
            LogLevel::Info => info!("{message}"),
            LogLevel::Debug => debug!("{message}"),
        }
    }

    /// Sum of token usage across raw outputs.
    #[must_use]
    pub fn total_token_usage(&self) -> TokenUsage {
        self.raw_outputs.iter().filter_map(|o| o.token_usage).sum()
    }

    /// Aggregate metrics for the trace.
    #[must_use]
    pub fn metrics(&self) -> TraceMetrics {
        TraceMetrics::collect(&self.steps, &self.raw_outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::message::Role;
    use crate::replay::RenderRequest;
    use crate::step::{ActionStep, PlanningStep, TaskStep, ToolCall};
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn sample_store() -> TraceStore {
        let mut store = TraceStore::new();
        store.append(SystemPromptStep::new("draft prompt"));
        store.append(TaskStep::new("find the answer"));
        store.append(PlanningStep::new("1. search", "nothing known"));

        let mut action = ActionStep::new(1);
        action.record_memory(vec![Message::user("secret context")]);
        action.record_llm_output("I will search");
        action.record_tool_calls(vec![ToolCall::new("c1", "search", json!({"q": "answer"}))]);
        action.record_observations("42");
        action.finish();
        store.append(action);

        store.append(ActionStep::new(2));
        store
    }

    #[test]
    fn test_append_preserves_order() {
        let store = sample_store();
        let kinds: Vec<&str> = store.steps().iter().map(Step::kind).collect();
        assert_eq!(kinds, ["system_prompt", "task", "planning", "action", "action"]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_replace_system_prompt_keeps_rest() {
        let mut store = sample_store();
        let before: Vec<Step> = store.steps()[1..].to_vec();

        store.replace_system_prompt(SystemPromptStep::new("final prompt"));
        assert_eq!(
            store.steps()[0],
            Step::SystemPrompt(SystemPromptStep::new("final prompt"))
        );
        assert_eq!(&store.steps()[1..], before.as_slice());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_log_step_rejects_nonzero_position() {
        let mut store = sample_store();
        let before = store.steps().to_vec();

        for position in [1, 2, 99] {
            let err = store
                .log_step(SystemPromptStep::new("x"), Some(position))
                .unwrap_err();
            assert_eq!(err, TraceError::InvalidPosition { position });
        }
        assert_eq!(store.steps(), before.as_slice());

        store
            .log_step(SystemPromptStep::new("head"), Some(0))
            .unwrap();
        assert_eq!(store.len(), 5);
        store.log_step(TaskStep::new("more"), None).unwrap();
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_log_step_head_requires_system_prompt() {
        let mut store = TraceStore::new();
        store.append(SystemPromptStep::new("p"));
        store.append(TaskStep::new("t"));

        let err = store
            .log_step(TaskStep::new("intruder"), Some(0))
            .unwrap_err();
        assert_eq!(err, TraceError::NotSystemPrompt { kind: "task" });

        let err = store
            .log_step(ActionStep::default(), Some(0))
            .unwrap_err();
        assert_eq!(err, TraceError::NotSystemPrompt { kind: "action" });

        let kinds: Vec<&str> = store.steps().iter().map(Step::kind).collect();
        assert_eq!(kinds, ["system_prompt", "task"]);
        assert_eq!(
            store.steps()[0],
            Step::SystemPrompt(SystemPromptStep::new("p"))
        );
    }

    #[test]
    fn test_replace_on_empty_store() {
        let mut store = TraceStore::new();
        store.replace_system_prompt(SystemPromptStep::new("only"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reset_keeps_raw_outputs() {
        let mut store = sample_store();
        store.record_raw_output(ModelOutput::new(Message::assistant("raw")));
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.raw_outputs().len(), 1);
    }

    #[test]
    fn test_succinct_view_drops_memory() {
        let mut store = sample_store();
        store.append(ActionStep::default());
        let view = store.succinct_view();
        assert_eq!(view.len(), store.len());
        assert!(view.iter().all(|v| v.get(AGENT_MEMORY_KEY).is_none()));
        assert_eq!(view[3]["observations"], "42");

        let export = store.full_export();
        assert_eq!(
            export.steps[3][AGENT_MEMORY_KEY][0]["content"][0]["text"],
            "secret context"
        );
    }

    #[test]
    fn test_full_export_shape() {
        let mut store = sample_store();
        store.record_raw_output(
            ModelOutput::new(Message::assistant("raw")).with_token_usage(TokenUsage::new(7, 3)),
        );
        let export = store.full_export();
        assert_eq!(export.steps.len(), 5);
        assert_eq!(export.raw_outputs.len(), 1);

        let value = serde_json::to_value(&export).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(value["raw_outputs"][0]["token_usage"]["input_tokens"], 7);
        assert_eq!(store.total_token_usage(), TokenUsage::new(7, 3));
    }

    #[test]
    fn test_project_all_is_deterministic() {
        let store = sample_store();
        let a = serde_json::to_string(&store.project_all(false, true)).unwrap();
        let b = serde_json::to_string(&store.project_all(false, true)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_project_all_modes() {
        let store = sample_store();

        let full: Vec<Role> = store.project_all(false, false).iter().map(|m| m.role).collect();
        assert_eq!(
            full,
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Assistant,
                Role::Assistant,
                Role::Assistant,
                Role::ToolResponse,
            ]
        );

        let summary: Vec<Role> = store.project_all(true, false).iter().map(|m| m.role).collect();
        assert_eq!(
            summary,
            [Role::User, Role::Assistant, Role::Assistant, Role::ToolResponse]
        );

        let with_memory = store.project_all(false, true);
        assert_eq!(with_memory.len(), full.len() + 1);
        assert_eq!(with_memory[4].role, Role::System);
    }

    #[test]
    fn test_replay_into_sink() {
        let mut store = sample_store();
        let mut failing = ActionStep::new(3);
        failing.record_error(AgentError::parsing("unparsable output"));
        store.append(failing);

        let mut sink: Vec<RenderRequest> = Vec::new();
        store.replay_into(&mut sink, false);

        assert_eq!(sink[0].title, "SYSTEM, STEP 0, SUBSTEP 1/1");
        assert_eq!(sink[2].title, "ASSISTANT, STEP 1, SUBSTEP 1/1");
        let last = sink.last().unwrap();
        assert_eq!(last.title, "ASSISTANT, STEP 5, SUBSTEP 1/1");
        assert!(last.body.contains("unparsable output"));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn take(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.0.lock().unwrap())).unwrap()
        }
    }

    fn capture<F: FnOnce()>(buf: &SharedBuf, f: F) -> String {
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        buf.take()
    }

    #[test]
    fn test_log_respects_verbosity() {
        let buf = SharedBuf::default();

        let store = TraceStore::new();
        let out = capture(&buf, || {
            store.log(LogLevel::Debug, "debug at info");
            store.log(LogLevel::Info, "info at info");
            store.log(LogLevel::Error, "error at info");
        });
        assert!(!out.contains("debug at info"));
        assert!(out.contains("info at info"));
        assert!(out.contains("error at info"));

        let store = TraceStore::with_config(TraceConfig::new().with_level(LogLevel::Error));
        let out = capture(&buf, || {
            store.log(LogLevel::Debug, "debug at error");
            store.log(LogLevel::Info, "info at error");
            store.log(LogLevel::Error, "error at error");
        });
        assert!(!out.contains("debug at error"));
        assert!(!out.contains("info at error"));
        assert!(out.contains("error at error"));

        let store = TraceStore::with_config(TraceConfig::new().with_level(LogLevel::Debug));
        let out = capture(&buf, || {
            store.log(LogLevel::Debug, "debug at debug");
            store.log(LogLevel::Error, "error at debug");
        });
        assert!(out.contains("debug at debug"));
        assert!(out.contains("error at debug"));
    }

    #[test]
    fn test_replay_emits_on_replay_target() {
        let buf = SharedBuf::default();
        let out = capture(&buf, || sample_store().replay(false));

        assert!(out.contains("steptrace::replay"));
        assert!(out.contains("SYSTEM, STEP 0, SUBSTEP 1/1"));
        assert!(out.contains("draft prompt"));
        assert!(!out.contains("secret context"));
    }

    #[test]
    fn test_metrics_from_store() {
        let store = sample_store();
        let metrics = store.metrics();
        assert_eq!(metrics.steps, 5);
        assert_eq!(metrics.action_steps, 2);
        assert_eq!(metrics.tool_calls, 1);
        assert_eq!(metrics.errors, 0);
    }
}
