use kt_rigid_payloads::ShapeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Transform from frame '{from}' to frame '{to}' not found")]
    TransformNotFound { from: String, to: String },

    #[error("Frame '{0}' does not exist")]
    FrameNotFound(String),

    #[error("No transform is registered under the name '{0}'")]
    NameNotFound(String),

    #[error("A different transform is already registered under the name '{0}'")]
    DuplicateName(String),

    #[error("Transform graph has no frames")]
    EmptyGraph,

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

pub type TransformResult<T> = Result<T, TransformError>;
