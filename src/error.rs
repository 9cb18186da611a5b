use thiserror::Error;

/// Errors produced while loading inputs, tracing, or exporting a graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying file I/O failed (missing input file, unwritable output path).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The input document is not valid JSON or does not match the expected schema.
    #[error("failed to parse input json: {0}")]
    Json(#[from] serde_json::Error),

    /// The input document parsed but its contents are unusable.
    #[error("invalid input data: {0}")]
    InvalidInput(String),

    /// The traced forward pass could not be turned into a graph.
    #[error("trace error: {0}")]
    Trace(String),

    /// A constant subgraph could not be evaluated at export time.
    #[error("constant folding failed: {0}")]
    Fold(String),

    /// Protobuf serialization failed.
    #[error("protobuf error: {0}")]
    Proto(#[from] protobuf::Error),
}
