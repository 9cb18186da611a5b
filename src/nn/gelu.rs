use crate::nn::Module;
use crate::trace::Value;

/// Applies the Gaussian Error Linear Units function element-wise, in its
/// exact form `x * Φ(x)` (no tanh approximation).
#[derive(Clone, Debug, Default)]
pub struct Gelu {}

impl Gelu {
    /// Create the module.
    pub fn new() -> Self {
        Self {}
    }
}

impl Module for Gelu {
    /// Applies the forward pass on the input value.
    ///
    /// # Shapes
    ///
    /// - input: `[..., any]`
    /// - output: `[..., any]`
    fn forward(&self, input: Value) -> Value {
        input.gelu()
    }
}
