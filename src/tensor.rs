use crate::error::Error;
use crate::ir::{Data, Shape, TensorData};

/// A dense f32 tensor used as sample input for tracing and for evaluating
/// constant subgraphs at export time.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// The shape of the tensor.
    pub shape: Shape,

    /// The flattened values, in row-major order.
    pub data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor, checking that the shape matches the number of values.
    pub fn new(data: Vec<f32>, shape: Shape) -> Result<Self, Error> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::InvalidInput(format!(
                "shape {:?} implies {} elements but {} were provided",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create a 1-D tensor from a vector.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let shape = vec![data.len()];
        Self { shape, data }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Apply a function to every element, preserving shape.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().copied().map(f).collect(),
        }
    }

    /// Combine two tensors elementwise. The shapes must match exactly, or
    /// one side must be a single element which is then broadcast.
    pub fn zip(&self, other: &Tensor, f: impl Fn(f32, f32) -> f32) -> Result<Tensor, Error> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect();
            return Ok(Tensor {
                shape: self.shape.clone(),
                data,
            });
        }
        if other.data.len() == 1 {
            let b = other.data[0];
            return Ok(self.map(|a| f(a, b)));
        }
        if self.data.len() == 1 {
            let a = self.data[0];
            return Ok(other.map(|b| f(a, b)));
        }
        Err(Error::Fold(format!(
            "cannot broadcast shapes {:?} and {:?}",
            self.shape, other.shape
        )))
    }
}

impl From<&Tensor> for TensorData {
    fn from(tensor: &Tensor) -> Self {
        TensorData::new_f32(tensor.data.clone(), tensor.shape.clone())
    }
}

impl From<&TensorData> for Tensor {
    fn from(data: &TensorData) -> Self {
        Tensor {
            shape: data.shape.clone(),
            data: match &data.data {
                Data::Float32s(values) => values.clone(),
                Data::Int64s(values) => values.iter().map(|&v| v as f32).collect(),
            },
        }
    }
}

/// Elementwise activation functions.
pub mod activation {
    use super::Tensor;

    /// Applies the exact Gaussian Error Linear Units function element-wise:
    /// `gelu(x) = x * Φ(x)` where Φ is the standard normal CDF. This is the
    /// non-approximated form, not the tanh variant.
    pub fn gelu(tensor: &Tensor) -> Tensor {
        tensor.map(gelu_scalar)
    }

    pub(crate) fn gelu_scalar(x: f32) -> f32 {
        let x = x as f64;
        (x * 0.5 * (1.0 + libm::erf(x / core::f64::consts::SQRT_2))) as f32
    }

    /// The Gauss error function, element-wise.
    pub fn erf(tensor: &Tensor) -> Tensor {
        tensor.map(|x| libm::erf(x as f64) as f32)
    }
}
