use thiserror::Error;

use crate::types::{BindingHandle, EventKind};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("a binding for {} on {selector} is already registered", .event.as_str())]
    DuplicateTrigger { selector: String, event: EventKind },

    #[error("no binding registered under handle {0}")]
    UnknownBinding(BindingHandle),

    #[error("unknown validator: {0}")]
    UnknownValidator(String),

    #[error("unknown outcome handler: {0}")]
    UnknownOutcome(String),

    #[error("no value for url placeholder {{{0}}}")]
    MissingPlaceholder(String),

    #[error("could not attach listener for {trigger}: {reason}")]
    Attach { trigger: String, reason: String },

    #[error("invalid page configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid log filter: {0}")]
    LogFilter(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}
