//! Role-tagged messages produced by projecting steps.
//!
//! A [`Message`] is the unit handed to the downstream consumer, either a
//! language model or the replay renderer. Content stays structured from the
//! moment it is created so nothing downstream has to re-parse it.

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// System instruction or memory echo.
    #[serde(rename = "system")]
    System,
    /// User input.
    #[serde(rename = "user")]
    User,
    /// Model output.
    #[serde(rename = "assistant")]
    Assistant,
    /// Result of a tool call.
    #[serde(rename = "tool-response")]
    ToolResponse,
}

impl Role {
    /// Get the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolResponse => "tool-response",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to an image payload, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Create a new image reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image reference.
    Image {
        /// The image handle.
        image: ImageRef,
    },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part.
    #[must_use]
    pub fn image(image: impl Into<ImageRef>) -> Self {
        Self::Image {
            image: image.into(),
        }
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// A bare string.
    Text(String),
    /// Ordered text and image parts.
    Parts(Vec<ContentPart>),
    /// A memory snapshot of earlier messages, echoed verbatim.
    ///
    /// The wire form is untagged, so an empty history serializes as `[]` and
    /// reads back as an empty [`Parts`](Self::Parts). Both carry no text and
    /// replay as zero items.
    History(Vec<Message>),
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who the message is attributed to.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
}

impl Message {
    /// Create a message from a role and content.
    #[must_use]
    pub const fn new(role: Role, content: MessageContent) -> Self {
        Self { role, content }
    }

    /// Create a message whose content is a single text part.
    #[must_use]
    pub fn text_part(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, MessageContent::Parts(vec![ContentPart::text(text)]))
    }

    /// Create a system message with a single text part.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::text_part(Role::System, text)
    }

    /// Create a user message with a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::text_part(Role::User, text)
    }

    /// Create an assistant message with a single text part.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text_part(Role::Assistant, text)
    }

    /// Create a tool-response message with bare string content.
    #[must_use]
    pub fn tool_response(text: impl Into<String>) -> Self {
        Self::new(Role::ToolResponse, MessageContent::Text(text.into()))
    }

    /// Concatenated text of the message, ignoring images.
    ///
    /// Returns `None` for memory echoes and for part lists without any text.
    #[must_use]
    pub fn text_content(&self) -> Option<String> {
        match &self.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        ContentPart::Image { .. } => None,
                    })
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.join("\n"))
                }
            }
            MessageContent::History(_) => None,
        }
    }
}

/// Rendering mode for step projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProjectionMode {
    /// Omit verbose fields such as raw model text and the full plan.
    pub summary_mode: bool,
    /// Echo each action step's memory snapshot.
    pub include_memory: bool,
}

impl ProjectionMode {
    /// Full rendering without memory echo.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            summary_mode: false,
            include_memory: false,
        }
    }

    /// Summarized rendering without memory echo.
    #[must_use]
    pub const fn summary() -> Self {
        Self {
            summary_mode: true,
            include_memory: false,
        }
    }

    /// Set whether memory snapshots are echoed.
    #[must_use]
    pub const fn with_memory(mut self, include_memory: bool) -> Self {
        self.include_memory = include_memory;
        self
    }
}
