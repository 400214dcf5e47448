use thiserror::Error;

/// Failures of the escape sequence codec. None of these are fatal, callers
/// treat undecodable data as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("not an escape sequence")]
    NotEscapeSequence,
    #[error("invalid parameters for sequence")]
    InvalidColor,
    #[error("invalid attribute")]
    InvalidAttribute,
    #[error("invalid foreground")]
    InvalidForeground,
    #[error("invalid background")]
    InvalidBackground,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TtkError {
    #[error("widget not registered: {0}")]
    WidgetNotRegistered(String),
    /// A registered constructor built a different type than the typed add
    /// call expected.
    #[error("widget kind {0} built an unexpected type")]
    UnexpectedWidget(String),
    #[error("terminal already initialized")]
    AlreadyInitialized,
    /// A blocking call was made from the worker, which would wait on itself.
    #[error("blocking call made from worker context")]
    WorkerContext,
    #[error("worker is no longer running")]
    WorkerGone,
}
