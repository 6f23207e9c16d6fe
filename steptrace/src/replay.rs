//! Human-readable replay of a projected message sequence.
//!
//! The renderer walks the messages in order, splits each one into items and
//! hands every item to a [`ReplaySink`] as a titled, themed block. Styling is
//! left to the sink.
//!
//! Turn numbering: the step counter advances on every assistant message, so
//! the system prompt and the task render as step 0.

use serde::Serialize;
use tracing::info;

use crate::json::to_json_safe;
use crate::message::{Message, MessageContent, Role};

/// Visual theme for a rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Used for assistant and system messages.
    Monokai,
    /// Used for tool responses.
    GithubDark,
    /// Used for everything else.
    Default,
}

impl Theme {
    /// Theme for a message role.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Assistant | Role::System => Self::Monokai,
            Role::ToolResponse => Self::GithubDark,
            Role::User => Self::Default,
        }
    }

    /// Get the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monokai => "monokai",
            Self::GithubDark => "github_dark",
            Self::Default => "default",
        }
    }
}

/// One block to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Block title, e.g. `ASSISTANT, STEP 1, SUBSTEP 1/2`.
    pub title: String,
    /// Formatted body.
    pub body: String,
    /// Theme to render the body with.
    pub theme: Theme,
}

/// Destination for replay blocks.
pub trait ReplaySink {
    /// Render one block.
    fn render(&mut self, request: RenderRequest);
}

impl ReplaySink for Vec<RenderRequest> {
    fn render(&mut self, request: RenderRequest) {
        self.push(request);
    }
}

/// Sink that emits each block as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReplaySink for TracingSink {
    fn render(&mut self, request: RenderRequest) {
        info!(
            target: "steptrace::replay",
            title = %request.title,
            theme = request.theme.as_str(),
            "{}",
            request.body
        );
    }
}

/// Render a message sequence into `sink`.
///
/// Never fails: content that is not a list of items is shown as a single
/// opaque item.
pub fn render_replay<S: ReplaySink + ?Sized>(messages: &[Message], sink: &mut S) {
    let mut ix = 0usize;
    for message in messages {
        if message.role == Role::Assistant {
            ix += 1;
        }
        let theme = Theme::for_role(message.role);
        let role = message.role.as_str().to_uppercase();

        let items = content_items(&message.content);
        let total = items.len();
        for (substep, body) in items.into_iter().enumerate() {
            sink.render(RenderRequest {
                title: format!("{role}, STEP {ix}, SUBSTEP {}/{total}", substep + 1),
                body,
                theme,
            });
        }
    }
}

fn content_items(content: &MessageContent) -> Vec<String> {
    match content {
        MessageContent::Text(text) => vec![text.clone()],
        MessageContent::Parts(parts) => parts.iter().map(pretty).collect(),
        MessageContent::History(history) => history.iter().map(pretty).collect(),
    }
}

fn pretty<T: Serialize>(item: &T) -> String {
    let value = to_json_safe(item);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
