use thiserror::Error;

/// Failures raised while loading a diagram, before layout runs.
///
/// The layout engine itself never fails; these only come from the input layer
/// that enforces structural rules such as id uniqueness.
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid diagram JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(String),
    #[error("node id must not be empty")]
    EmptyNodeId,
}
