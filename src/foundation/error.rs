/// Result alias used across the crate.
pub type OutlineResult<T> = Result<T, OutlineError>;

/// Errors produced while configuring, planning or executing the outline passes.
///
/// None of these ever escape [`crate::OutlineFeature::render`]: the orchestrator turns them into a
/// skipped or failed frame and leaves the host's camera color untouched.
#[derive(thiserror::Error, Debug)]
pub enum OutlineError {
    /// Invalid input (configuration, plan shape, buffer sizes).
    #[error("validation error: {0}")]
    Validation(String),

    /// The outline program (or one of its sub-programs) could not be loaded.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A transient image could not be allocated for this frame.
    #[error("buffer allocation failed: {0}")]
    BufferAllocation(String),

    /// Internal failure while executing a pass.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Settings could not be parsed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Error raised by an external collaborator (program loader, scene query).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OutlineError {
    /// Build a [`OutlineError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`OutlineError::ResourceUnavailable`].
    pub fn resource_unavailable(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    /// Build a [`OutlineError::BufferAllocation`].
    pub fn buffer_allocation(msg: impl Into<String>) -> Self {
        Self::BufferAllocation(msg.into())
    }

    /// Build a [`OutlineError::Evaluation`].
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`OutlineError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
