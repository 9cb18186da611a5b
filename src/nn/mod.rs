mod gelu;

pub use gelu::*;

use crate::trace::Value;

/// A stateless computational unit whose forward pass can be traced into a
/// graph. Implementors describe their computation through operations on
/// [`Value`], which record the corresponding graph nodes as they run.
pub trait Module {
    /// Applies the forward pass on the traced input.
    fn forward(&self, input: Value) -> Value;
}
