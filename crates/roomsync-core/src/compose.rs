//! Outgoing draft text.

/// Canned quick-insert symbols offered next to the input box.
pub const QUICK_TOKENS: [&str; 8] = ["😀", "🤣", "👍", "🔥", "🚀", "🤔", "✅", "🏆"];

/// Draft text for the active room.
///
/// Holds raw input exactly as typed; trimming only happens when the draft is
/// prepared for sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeBuffer {
    draft: String,
}

impl ComposeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate `token` onto the draft. No trimming or validation.
    pub fn append_token(&mut self, token: &str) {
        self.draft.push_str(token);
    }

    /// Append the quick-insert symbol at `index`.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn append_quick(&mut self, index: usize) -> bool {
        match QUICK_TOKENS.get(index) {
            Some(token) => {
                self.append_token(token);
                true
            },
            None => false,
        }
    }

    /// Replace the draft with raw input.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Current draft.
    pub fn text(&self) -> &str {
        &self.draft
    }

    /// Whether the draft is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.draft.trim().is_empty()
    }

    /// Trimmed draft ready to send. `None` if blank.
    pub fn prepare(&self) -> Option<String> {
        let text = self.draft.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Discard the draft.
    pub fn clear(&mut self) {
        self.draft.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_token_concatenates_without_trimming() {
        let mut buffer = ComposeBuffer::new();
        buffer.set_text("go ");
        buffer.append_token("🚀");

        assert_eq!(buffer.text(), "go 🚀");
    }

    #[test]
    fn append_quick_rejects_out_of_range() {
        let mut buffer = ComposeBuffer::new();
        assert!(buffer.append_quick(2));
        assert!(!buffer.append_quick(QUICK_TOKENS.len()));

        assert_eq!(buffer.text(), "👍");
    }

    #[test]
    fn prepare_trims() {
        let mut buffer = ComposeBuffer::new();
        buffer.set_text("  hello \n");
        assert_eq!(buffer.prepare().as_deref(), Some("hello"));

        buffer.set_text(" \t ");
        assert!(buffer.is_blank());
        assert_eq!(buffer.prepare(), None);
    }
}
