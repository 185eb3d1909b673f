use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn heading(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One role-tagged message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Append-only history handed to both the writer and the critic.
///
/// Turns can only be added with [`Conversation::push`]; nothing removes,
/// edits or reorders them, so insertion order is exactly the order in
/// which the exchange happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with the topic as its first user turn
    pub fn seeded(topic: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Turn::user(topic));
        conversation
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Content of the most recent assistant turn, if any
    pub fn last_assistant(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
    }

    /// Render the turns as Markdown sections, oldest first
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        let mut drafts = 0;
        for turn in &self.turns {
            match turn.role {
                Role::Assistant => {
                    drafts += 1;
                    let _ = writeln!(out, "### {} (draft {})", turn.role.heading(), drafts);
                }
                Role::User => {
                    let _ = writeln!(out, "### {}", turn.role.heading());
                }
            }
            if turn.content.is_empty() {
                out.push_str("(empty)\n\n");
            } else {
                out.push_str(turn.content.trim_end());
                out.push_str("\n\n");
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
