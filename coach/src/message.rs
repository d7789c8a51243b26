//! Role-tagged chat messages sent to the model gateway.
//!
//! Roles: System (usually first in the list), Human, Ai. Order within a list is the
//! conversational turn order and is preserved end to end.

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ChatMessage {
    /// Instructions for the model; typically placed first in the message list.
    System(String),
    /// User-originated text.
    Human(String),
    /// Model reply from an earlier turn.
    Ai(String),
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Creates a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human(content.into())
    }

    /// Creates an ai message.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai(content.into())
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::System(s) | Self::Human(s) | Self::Ai(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: system/human/ai constructors produce the correct variant with content.
    #[test]
    fn constructors_produce_matching_variants() {
        assert!(matches!(&ChatMessage::system("s"), ChatMessage::System(c) if c == "s"));
        assert!(matches!(&ChatMessage::human("h"), ChatMessage::Human(c) if c == "h"));
        assert!(matches!(&ChatMessage::ai("a"), ChatMessage::Ai(c) if c == "a"));
    }

    /// **Scenario**: serialized form carries a lowercase role tag next to the content.
    #[test]
    fn serializes_with_role_tag() {
        let json = serde_json::to_value(ChatMessage::human("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "human", "content": "hello"}));
        let back: ChatMessage =
            serde_json::from_value(serde_json::json!({"role": "ai", "content": "hi"})).unwrap();
        assert_eq!(back, ChatMessage::ai("hi"));
    }
}
