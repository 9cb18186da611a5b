//! Traces a small activation model on sample data and serializes the traced
//! computation graph to an ONNX file.
//!
//! The crate is built around three steps:
//!
//! 1. [`input::load_input`] reads a JSON document holding a sample tensor,
//! 2. a [`nn::Module`] describes its computation through operations on
//!    traced [`trace::Value`]s, and
//! 3. [`export::export`] records one forward pass and writes the resulting
//!    graph, with endpoint names and dynamic-axis metadata, as a binary
//!    ONNX model.

pub mod error;
pub mod export;
pub mod fold;
pub mod input;
pub mod ir;
pub mod nn;
pub mod proto_conversion;
pub mod tensor;
pub mod trace;

/// Generated ONNX protobuf bindings.
#[allow(clippy::all)]
pub mod protos {
    include!(concat!(env!("OUT_DIR"), "/onnx-protos/mod.rs"));
    pub use self::onnx::*;
}

pub use error::Error;
pub use export::{export, generate, ExportConfig};
pub use tensor::Tensor;
