//! Object key derivation.

/// How a queue message id maps to an object key: `{prefix}{message_id}{suffix}`.
///
/// The mapping is pure, so reprocessing a redelivered message overwrites the
/// object written the first time instead of adding a second one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyLayout {
    pub prefix: String,
    pub suffix: String,
}

impl ObjectKeyLayout {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Object key for the message with the given id.
    pub fn key_for(&self, message_id: &str) -> String {
        format!("{}{}{}", self.prefix, message_id, self.suffix)
    }
}

impl Default for ObjectKeyLayout {
    fn default() -> Self {
        Self::new("messages/", ".json")
    }
}
