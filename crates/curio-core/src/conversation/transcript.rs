//! Ordered transcript owned by the conversation controller.

use super::message::{Message, Sender};

/// Ordered sequence of messages for one page visit.
///
/// Messages are only ever appended with a fresh `order`, or rebuilt wholesale
/// from the persisted log. Display order always equals `order` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a transcript from the persisted conversation log.
    ///
    /// The transport may return rows in any order; rows are sorted by their
    /// `order` field. The sort is stable so equal orders keep arrival order.
    pub fn rehydrate(mut persisted: Vec<Message>) -> Self {
        persisted.sort_by_key(|message| message.order);
        Self {
            messages: persisted,
        }
    }

    /// The `order` value the next appended message receives.
    pub fn next_order(&self) -> i64 {
        self.messages
            .iter()
            .map(|message| message.order)
            .max()
            .map(|order| order + 1)
            .unwrap_or(1)
    }

    /// Appends a locally created message and returns a reference to it.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> &Message {
        let message = Message::local(sender, text, self.next_order());
        self.messages.push(message);
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages the respondent has sent, persisted ones included.
    pub fn respondent_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.sender == Sender::Respondent)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(id: &str, sender: Sender, order: i64) -> Message {
        Message {
            id: id.to_string(),
            sender,
            text: format!("text-{}", id),
            order,
        }
    }

    #[test]
    fn test_rehydrate_sorts_by_order() {
        let transcript = Transcript::rehydrate(vec![
            persisted("c", Sender::Assistant, 3),
            persisted("a", Sender::Assistant, 1),
            persisted("b", Sender::Respondent, 2),
        ]);
        let ids: Vec<&str> = transcript.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(transcript.next_order(), 4);
        assert_eq!(transcript.respondent_turns(), 1);
    }

    #[test]
    fn test_append_assigns_increasing_order() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.next_order(), 1);
        transcript.append(Sender::Assistant, "Hi");
        transcript.append(Sender::Respondent, "Hello");
        let orders: Vec<i64> = transcript.messages().iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(transcript.messages()[0].id.starts_with("local-"));
    }
}
