//! Append-only chat log.

use crate::protocol::ChatMessage;

/// Chat lines in arrival order.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(user: &str, text: &str) -> ChatMessage {
        ChatMessage {
            user: user.to_string(),
            text: text.to_string(),
            timestamp: "10:00".to_string(),
        }
    }

    #[test]
    fn test_arrival_order() {
        let mut log = ChatLog::new();
        log.push(msg("Ada", "first"));
        log.push(msg("Bob", "second"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0].text, "first");
        assert_eq!(log.last().map(|m| m.user.as_str()), Some("Bob"));
    }
}
