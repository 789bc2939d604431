use thiserror::Error;

/// Why a URL did not turn into a list element.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No registered source claims the URL's domain.
    #[error("no source registered for {0}")]
    NoSource(String),

    /// A source matched but fetching or parsing failed.
    #[error("source {source_name} failed for {url}: {reason}")]
    Failed {
        source_name: String,
        url: String,
        reason: String,
    },
}

impl ResolveError {
    pub fn failed(source_name: &str, url: &str, reason: impl std::fmt::Display) -> Self {
        ResolveError::Failed {
            source_name: source_name.to_string(),
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_no_source(&self) -> bool {
        matches!(self, ResolveError::NoSource(_))
    }
}

/// Bad user-supplied input. Reported to the user, never fatal to a batch.
#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("unknown list \"{0}\"")]
    UnknownList(String),

    #[error("invalid rating \"{0}\"")]
    InvalidRating(String),

    #[error("title must not be empty")]
    EmptyTitle,
}
