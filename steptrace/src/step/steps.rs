//! The four step kinds and their projection into messages.

use serde_json::{Map, Value, json};

use super::timing::Timing;
use super::types::ToolCall;
use crate::error::AgentError;
use crate::json::to_json_safe;
use crate::message::{ContentPart, ImageRef, Message, MessageContent, ProjectionMode, Role};

const RETRY_SUFFIX: &str = "\nNow let's retry: take care not to repeat previous errors! If you have retried several times, try a completely different approach.\n";

/// The system prompt that opens a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPromptStep {
    /// The prompt text.
    pub system_prompt: String,
}

impl SystemPromptStep {
    /// Create a new system prompt step.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Convert to messages. Emits nothing in summary mode.
    #[must_use]
    pub fn to_messages(&self, mode: ProjectionMode) -> Vec<Message> {
        if mode.summary_mode {
            return Vec::new();
        }
        vec![Message::system(self.system_prompt.trim())]
    }

    /// Export as a JSON mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "system_prompt": self.system_prompt })
    }
}

/// A task handed to the agent, optionally with images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStep {
    /// The task text.
    pub task: String,
    /// Images attached to the task.
    pub task_images: Option<Vec<ImageRef>>,
}

impl TaskStep {
    /// Create a new task step without images.
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            task_images: None,
        }
    }

    /// Attach images to the task.
    #[must_use]
    pub fn with_images<I, T>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ImageRef>,
    {
        self.task_images = Some(images.into_iter().map(Into::into).collect());
        self
    }

    /// Convert to a single user message.
    #[must_use]
    pub fn to_messages(&self, _mode: ProjectionMode) -> Vec<Message> {
        let mut content = vec![ContentPart::text(format!("New task:\n{}", self.task))];
        if let Some(images) = &self.task_images {
            content.extend(images.iter().cloned().map(ContentPart::image));
        }
        vec![Message::new(Role::User, MessageContent::Parts(content))]
    }

    /// Export as a JSON mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "task": self.task,
            "task_images": self.task_images,
        })
    }
}

/// Output of a planning cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningStep {
    /// The plan text.
    pub plan: String,
    /// The facts survey.
    pub facts: String,
}

impl PlanningStep {
    /// Create a new planning step.
    #[must_use]
    pub fn new(plan: impl Into<String>, facts: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            facts: facts.into(),
        }
    }

    /// Convert to messages: facts first, then the plan unless summarizing.
    #[must_use]
    pub fn to_messages(&self, mode: ProjectionMode) -> Vec<Message> {
        let mut messages = vec![Message::new(
            Role::Assistant,
            MessageContent::Text(format!("[FACTS LIST]:\n{}", self.facts.trim())),
        )];
        if !mode.summary_mode {
            messages.push(Message::new(
                Role::Assistant,
                MessageContent::Text(format!("[PLAN]:\n{}", self.plan.trim())),
            ));
        }
        messages
    }

    /// Export as a JSON mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "plan": self.plan,
            "facts": self.facts,
        })
    }
}

/// One reasoning/acting cycle of the agent.
///
/// Created when the cycle starts and filled in as it progresses: model output,
/// tool calls, then either an error or observations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionStep {
    /// Memory snapshot the model saw for this step.
    pub agent_memory: Option<Vec<Message>>,
    /// Tool calls requested by the model.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Step timing.
    pub timing: Option<Timing>,
    /// Step number within the run.
    pub step_number: Option<usize>,
    /// Error raised while running the step.
    pub error: Option<AgentError>,
    /// Raw model output.
    pub llm_output: Option<String>,
    /// Observations returned by the tools.
    pub observations: Option<String>,
    /// Images observed during the step.
    pub observation_images: Option<Vec<ImageRef>>,
    /// Output of the action, if any.
    pub action_output: Option<Value>,
}

impl ActionStep {
    /// Start a new action step now.
    #[must_use]
    pub fn new(step_number: usize) -> Self {
        Self {
            step_number: Some(step_number),
            timing: Some(Timing::start_now()),
            ..Self::default()
        }
    }

    /// Record the memory snapshot sent to the model.
    pub fn record_memory(&mut self, memory: Vec<Message>) {
        self.agent_memory = Some(memory);
    }

    /// Record the raw model output.
    pub fn record_llm_output(&mut self, output: impl Into<String>) {
        self.llm_output = Some(output.into());
    }

    /// Record the tool calls parsed from the model output.
    pub fn record_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.tool_calls = Some(calls);
    }

    /// Record an error raised while running the step.
    pub fn record_error(&mut self, error: AgentError) {
        self.error = Some(error);
    }

    /// Record tool observations.
    pub fn record_observations(&mut self, observations: impl Into<String>) {
        self.observations = Some(observations.into());
    }

    /// Record images observed during the step.
    pub fn record_observation_images<I, T>(&mut self, images: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ImageRef>,
    {
        self.observation_images = Some(images.into_iter().map(Into::into).collect());
    }

    /// Record the action output.
    pub fn record_action_output(&mut self, output: Value) {
        self.action_output = Some(output);
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.timing.get_or_insert_with(Timing::start_now).complete();
    }

    /// Step duration in seconds, once finished.
    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        self.timing.as_ref().and_then(Timing::duration_secs)
    }

    /// Convert to messages.
    ///
    /// Emission order is fixed: memory echo, model output, tool calls, then
    /// either the error or the observation, then observed images.
    #[must_use]
    pub fn to_messages(&self, mode: ProjectionMode) -> Vec<Message> {
        let mut messages = Vec::new();

        if let Some(memory) = &self.agent_memory
            && mode.include_memory
        {
            messages.push(Message::new(
                Role::System,
                MessageContent::History(memory.clone()),
            ));
        }

        if let Some(output) = &self.llm_output
            && !mode.summary_mode
        {
            messages.push(Message::assistant(output.trim()));
        }

        if let Some(calls) = &self.tool_calls {
            let dump = Value::Array(calls.iter().map(ToolCall::to_value).collect());
            messages.push(Message::assistant(dump.to_string()));
        }

        let first_call_id = self
            .tool_calls
            .as_ref()
            .map(|calls| calls.first().map_or("", |c| c.id.as_str()));

        if let Some(error) = &self.error {
            let content = format!("Error:\n{}{RETRY_SUFFIX}", error.describe());
            match first_call_id {
                None => messages.push(Message::assistant(content)),
                Some(id) => {
                    messages.push(Message::tool_response(format!("Call id: {id}\n{content}")));
                }
            }
        } else if let (Some(observations), Some(id)) = (&self.observations, first_call_id) {
            messages.push(Message::tool_response(format!(
                "Call id: {id}\nObservation:\n{observations}"
            )));
        }

        if let Some(images) = &self.observation_images
            && !images.is_empty()
        {
            let mut content = vec![ContentPart::text("Here are the observed images:")];
            content.extend(images.iter().cloned().map(ContentPart::image));
            messages.push(Message::new(Role::User, MessageContent::Parts(content)));
        }

        messages
    }

    /// Export as a JSON mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let tool_calls: Vec<Value> = self
            .tool_calls
            .iter()
            .flatten()
            .map(ToolCall::to_value)
            .collect();

        let mut map = Map::new();
        map.insert("agent_memory".into(), to_json_safe(&self.agent_memory));
        map.insert("tool_calls".into(), Value::Array(tool_calls));
        Timing::export_into(self.timing.as_ref(), &mut map);
        map.insert("step".into(), json!(self.step_number));
        map.insert(
            "error".into(),
            self.error.as_ref().map_or(Value::Null, AgentError::to_value),
        );
        map.insert("llm_output".into(), json!(self.llm_output));
        map.insert("observations".into(), json!(self.observations));
        map.insert(
            "observations_images".into(),
            to_json_safe(&self.observation_images),
        );
        map.insert(
            "action_output".into(),
            to_json_safe(&self.action_output),
        );
        Value::Object(map)
    }
}

/// A recorded step of an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The run's system prompt.
    SystemPrompt(SystemPromptStep),
    /// A task issued to the agent.
    Task(TaskStep),
    /// A planning cycle.
    Planning(PlanningStep),
    /// A reasoning/acting cycle.
    Action(ActionStep),
}

impl Step {
    /// Project the step into zero or more messages.
    #[must_use]
    pub fn to_messages(&self, mode: ProjectionMode) -> Vec<Message> {
        match self {
            Self::SystemPrompt(s) => s.to_messages(mode),
            Self::Task(s) => s.to_messages(mode),
            Self::Planning(s) => s.to_messages(mode),
            Self::Action(s) => s.to_messages(mode),
        }
    }

    /// Export as a JSON mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::SystemPrompt(s) => s.to_value(),
            Self::Task(s) => s.to_value(),
            Self::Planning(s) => s.to_value(),
            Self::Action(s) => s.to_value(),
        }
    }

    /// Short name of the step kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SystemPrompt(_) => "system_prompt",
            Self::Task(_) => "task",
            Self::Planning(_) => "planning",
            Self::Action(_) => "action",
        }
    }

    /// Get the action step, if this is one.
    #[must_use]
    pub const fn as_action(&self) -> Option<&ActionStep> {
        match self {
            Self::Action(s) => Some(s),
            _ => None,
        }
    }
}

impl From<SystemPromptStep> for Step {
    fn from(step: SystemPromptStep) -> Self {
        Self::SystemPrompt(step)
    }
}

impl From<TaskStep> for Step {
    fn from(step: TaskStep) -> Self {
        Self::Task(step)
    }
}

impl From<PlanningStep> for Step {
    fn from(step: PlanningStep) -> Self {
        Self::Planning(step)
    }
}

impl From<ActionStep> for Step {
    fn from(step: ActionStep) -> Self {
        Self::Action(step)
    }
}
