// ABOUTME: Wrapper error for failures introduced by the execution mechanism.
// ABOUTME: unwrap_cause strips wrapper layers so callers see the task's own error.

/// A failure added by an invocation layer rather than by the task itself.
///
/// Anything that runs a task indirectly (a blocking-pool hop, a dynamic
/// dispatch shim) should wrap its own failures in this type. The executor
/// removes every such layer before reporting the error.
#[derive(Debug, thiserror::Error)]
#[error("invocation failed: {source}")]
pub struct InvocationError {
    #[source]
    source: anyhow::Error,
}

impl InvocationError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The wrapped error, one layer down.
    pub fn into_inner(self) -> anyhow::Error {
        self.source
    }
}

/// Strip `InvocationError` layers one at a time until a non-wrapper error remains.
pub fn unwrap_cause(mut err: anyhow::Error) -> anyhow::Error {
    loop {
        match err.downcast::<InvocationError>() {
            Ok(wrapper) => err = wrapper.into_inner(),
            Err(original) => return original,
        }
    }
}
