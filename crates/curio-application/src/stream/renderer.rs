//! Typing animation state.
//!
//! The renderer never owns a timer. A single scheduler tick calls [`TypingRenderer::tick`],
//! which re-reads the gap between committed and displayed text and reveals at
//! most one batch of characters.

/// Displayed/committed text pair for one assistant message.
///
/// `displayed()` is always a prefix of `committed()`: committed text only
/// grows, and the display offset only moves forward on character boundaries.
#[derive(Debug, Clone)]
pub struct TypingRenderer {
    committed: String,
    displayed_len: usize,
    batch_size: usize,
}

impl TypingRenderer {
    /// Creates a renderer revealing `batch_size` characters per tick (at least one).
    pub fn new(batch_size: usize) -> Self {
        Self {
            committed: String::new(),
            displayed_len: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// Appends newly decoded text. The pending catch-up simply grows.
    pub fn extend(&mut self, delta: &str) {
        self.committed.push_str(delta);
    }

    /// Reveals the next batch and returns it, or `None` when already caught up.
    pub fn tick(&mut self) -> Option<&str> {
        if self.is_converged() {
            return None;
        }
        let start = self.displayed_len;
        let end = self.committed[start..]
            .char_indices()
            .nth(self.batch_size)
            .map(|(offset, _)| start + offset)
            .unwrap_or(self.committed.len());
        self.displayed_len = end;
        Some(&self.committed[start..end])
    }

    /// Reveals everything left in one step and returns it.
    pub fn reveal_all(&mut self) -> Option<&str> {
        if self.is_converged() {
            return None;
        }
        let start = self.displayed_len;
        self.displayed_len = self.committed.len();
        Some(&self.committed[start..])
    }

    pub fn displayed(&self) -> &str {
        &self.committed[..self.displayed_len]
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Characters still waiting to be displayed.
    pub fn gap(&self) -> usize {
        self.committed[self.displayed_len..].chars().count()
    }

    pub fn is_converged(&self) -> bool {
        self.displayed_len == self.committed.len()
    }
}
