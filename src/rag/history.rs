//! Bounded conversation memory for interactive sessions.

use std::collections::VecDeque;

/// The most recent question/answer exchanges, rendered as plain text for
/// the system instructions.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    max_exchanges: usize,
    exchanges: VecDeque<(String, String)>,
}

impl ChatHistory {
    /// Keep at most `max_exchanges` exchanges. Zero disables history.
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            max_exchanges,
            exchanges: VecDeque::with_capacity(max_exchanges),
        }
    }

    /// Record an exchange, dropping the oldest beyond the limit.
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.max_exchanges == 0 {
            return;
        }
        self.exchanges.push_back((question.into(), answer.into()));
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
    }

    /// History text, or `None` when nothing has been said yet.
    pub fn render(&self) -> Option<String> {
        if self.exchanges.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .exchanges
            .iter()
            .map(|(q, a)| format!("User: {}\nAssistant: {}", q, a))
            .collect();
        Some(lines.join("\n"))
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_renders_nothing() {
        assert_eq!(ChatHistory::new(2).render(), None);
    }

    #[test]
    fn test_keeps_most_recent_exchanges() {
        let mut history = ChatHistory::new(2);
        history.push("one", "1");
        history.push("two", "2");
        history.push("three", "3");

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.render().as_deref(),
            Some("User: two\nAssistant: 2\nUser: three\nAssistant: 3")
        );

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_history() {
        let mut history = ChatHistory::new(0);
        history.push("q", "a");
        assert!(history.is_empty());
        assert_eq!(history.render(), None);
    }
}
