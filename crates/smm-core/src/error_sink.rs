//! Single absorption point for failures that escape a handler or a scheduler cycle.

use crate::Error;

/// Where a failure happened: the component/handler plus the event it was serving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorOrigin {
    pub component: &'static str,
    pub context: String,
}

impl ErrorOrigin {
    pub fn new(component: &'static str, context: impl Into<String>) -> Self {
        Self {
            component,
            context: context.into(),
        }
    }
}

/// Reports failures. Implementations must not panic or block.
pub trait ErrorSink: Send + Sync {
    fn report(&self, origin: &ErrorOrigin, error: &Error);
}

/// Production sink: one structured `error!` line per failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, origin: &ErrorOrigin, error: &Error) {
        tracing::error!(
            component = origin.component,
            context = %origin.context,
            kind = error.kind(),
            "{error}"
        );
    }
}
