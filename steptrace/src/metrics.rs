//! Aggregate metrics over a recorded trace.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::output::ModelOutput;
use crate::step::Step;

/// Counters collected from a trace's steps and raw outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMetrics {
    /// Total steps recorded.
    pub steps: usize,
    /// Action steps recorded.
    pub action_steps: usize,
    /// Planning steps recorded.
    pub planning_steps: usize,
    /// Tool calls across all action steps.
    pub tool_calls: usize,
    /// Action steps that carried an error.
    pub errors: usize,
    /// Total input tokens across raw outputs.
    pub input_tokens: u64,
    /// Total output tokens across raw outputs.
    pub output_tokens: u64,
    /// Summed duration of finished action steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl TraceMetrics {
    /// Collect metrics from steps and raw outputs.
    #[must_use]
    pub fn collect(steps: &[Step], raw_outputs: &[ModelOutput]) -> Self {
        let mut metrics = Self {
            steps: steps.len(),
            ..Self::default()
        };

        for step in steps {
            match step {
                Step::Planning(_) => metrics.planning_steps += 1,
                Step::Action(action) => {
                    metrics.action_steps += 1;
                    metrics.tool_calls += action.tool_calls.as_ref().map_or(0, Vec::len);
                    if action.error.is_some() {
                        metrics.errors += 1;
                    }
                    if let Some(secs) = action.duration_secs()
                        && secs >= 0.0
                    {
                        let total = metrics.duration.unwrap_or_default();
                        metrics.duration = Some(total + Duration::from_secs_f64(secs));
                    }
                }
                Step::SystemPrompt(_) | Step::Task(_) => {}
            }
        }

        for usage in raw_outputs.iter().filter_map(|o| o.token_usage) {
            metrics.input_tokens += u64::from(usage.input_tokens);
            metrics.output_tokens += u64::from(usage.output_tokens);
        }
        metrics
    }

    /// Total tokens (input + output).
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::fmt::Display for TraceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Trace Metrics")?;
        writeln!(
            f,
            "  Steps:      {} (action: {}, planning: {})",
            self.steps, self.action_steps, self.planning_steps
        )?;
        writeln!(
            f,
            "  Tokens:     {} (in: {}, out: {})",
            self.total_tokens(),
            self.input_tokens,
            self.output_tokens
        )?;
        if let Some(d) = self.duration {
            writeln!(f, "  Duration:   {:.2}s", d.as_secs_f64())?;
        }
        writeln!(f, "  Tool calls: {}", self.tool_calls)?;
        writeln!(f, "  Errors:     {}", self.errors)?;
        Ok(())
    }
}
