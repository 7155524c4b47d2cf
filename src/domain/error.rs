use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid content locator `{input}`: {reason}")]
    InvalidLocator { input: String, reason: &'static str },
}

impl DomainError {
    pub fn invalid_locator(input: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidLocator {
            input: input.into(),
            reason,
        }
    }
}
