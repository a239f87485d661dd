use serde::{Deserialize, Serialize};

use crate::api::HistoryMessage;

/// Role of a transcript entry. The transcript only ever holds conversation
/// turns; app notifications are [`Notice`]s and never enter it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }

    pub fn is_ai(self) -> bool {
        self == Role::Ai
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Base64-encoded image payload attached to an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAttachment {
    pub base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
}

impl Message {
    pub fn user(content: impl Into<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image,
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            image: None,
        }
    }
}

/// Ordered conversation transcript. Append and extend are the only mutations;
/// insertion order is significant and preserved.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Message>,
}

impl Transcript {
    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Fold one streamed response fragment into the transcript.
    ///
    /// If the last entry is an AI message the fragment extends its content;
    /// otherwise a new AI entry is started. The first fragment of a reply
    /// creates the entry; nothing is pre-inserted at send time.
    pub fn append_ai_chunk(&mut self, fragment: &str) {
        match self.entries.last_mut() {
            Some(last) if last.role.is_ai() => last.content.push_str(fragment),
            _ => self.entries.push(Message::ai(fragment)),
        }
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prior turns in wire form, for the outbound envelope's history field.
    pub fn history(&self) -> Vec<HistoryMessage> {
        self.entries
            .iter()
            .map(|m| HistoryMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Severity of a user-visible notification shown in the status area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}
