/// Decides whether a failed command's output indicates missing privileges.
///
/// False negatives surface as a plain failure; false positives show an unnecessary
/// administrator prompt.
pub trait PermissionPolicy: Send + Sync {
    fn is_permission_error(&self, output: &str) -> bool;
}

pub const DEFAULT_PERMISSION_PHRASES: &[&str] = &[
    "permission denied",
    "operation not permitted",
    "password is required",
    "requires root",
    "sudo",
    "insufficient permissions",
    "not writable",
];

/// Case-insensitive substring match against a phrase list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhrasePermissionPolicy {
    phrases: Vec<String>,
}

impl PhrasePermissionPolicy {
    pub fn new(phrases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|phrase| phrase.into().to_lowercase())
                .filter(|phrase| !phrase.is_empty())
                .collect(),
        }
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        let phrase = phrase.into().to_lowercase();
        if !phrase.is_empty() && !self.phrases.contains(&phrase) {
            self.phrases.push(phrase);
        }
        self
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl Default for PhrasePermissionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PERMISSION_PHRASES.iter().copied())
    }
}

impl PermissionPolicy for PhrasePermissionPolicy {
    fn is_permission_error(&self, output: &str) -> bool {
        let lowered = output.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    }
}
