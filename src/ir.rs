use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type Rank = usize;
pub type Shape = Vec<usize>;

/// The type of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Float64,
    Int32,
    Int64,
    Bool,
}

impl Default for ElementType {
    fn default() -> Self {
        Self::Float32
    }
}

/// Represents the type of a tensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorType {
    /// The element type of the tensor values.
    pub elem_type: ElementType,

    /// The number of dimensions in the tensor.
    pub rank: Rank,

    /// Static shape as recorded at trace time.
    pub static_shape: Option<Shape>,
}

/// The type of an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    Scalar(ElementType),
    Tensor(TensorType),
}

impl Default for ArgType {
    fn default() -> Self {
        Self::Tensor(TensorType::default())
    }
}

impl ArgType {
    /// Get the rank (number of dimensions).
    pub fn rank(&self) -> Rank {
        match self {
            ArgType::Scalar(_) => 0,
            ArgType::Tensor(t) => t.rank,
        }
    }

    /// Get the element type.
    pub fn elem_type(&self) -> ElementType {
        match self {
            ArgType::Scalar(elem) => *elem,
            ArgType::Tensor(t) => t.elem_type,
        }
    }

    /// Get the static shape if available.
    pub fn static_shape(&self) -> Option<&Shape> {
        match self {
            ArgType::Tensor(t) => t.static_shape.as_ref(),
            _ => None,
        }
    }
}

/// A node input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// The name of the argument. Refers to either a graph input, an
    /// initializer, or another node's output.
    pub name: String,

    /// The type of the argument.
    pub ty: ArgType,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Tensor values held by initializers and constant nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    Float32s(Vec<f32>),
    Int64s(Vec<i64>),
}

/// Representation of a tensor with data and shape information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    /// The shape of the tensor.
    pub shape: Shape,

    /// The flattened values, in row-major order.
    pub data: Data,
}

impl TensorData {
    /// Create new float tensor data from a vector and shape.
    pub fn new_f32(data: Vec<f32>, shape: Shape) -> Self {
        Self {
            shape,
            data: Data::Float32s(data),
        }
    }

    /// Create new int64 tensor data from a vector and shape.
    pub fn new_i64(data: Vec<i64>, shape: Shape) -> Self {
        Self {
            shape,
            data: Data::Int64s(data),
        }
    }

    /// The element type of the tensor.
    pub fn elem_type(&self) -> ElementType {
        match self.data {
            Data::Float32s(_) => ElementType::Float32,
            Data::Int64s(_) => ElementType::Int64,
        }
    }

    /// Number of elements held.
    pub fn num_elements(&self) -> usize {
        match &self.data {
            Data::Float32s(values) => values.len(),
            Data::Int64s(values) => values.len(),
        }
    }

    /// Get the values as f32, converting integer data.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.data {
            Data::Float32s(values) => values.clone(),
            Data::Int64s(values) => values.iter().map(|&v| v as f32).collect(),
        }
    }

    /// The tensor type of this data, shape fully static.
    pub fn tensor_type(&self) -> ArgType {
        ArgType::Tensor(TensorType {
            elem_type: self.elem_type(),
            rank: self.shape.len(),
            static_shape: Some(self.shape.clone()),
        })
    }
}

/// The value of a node attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float32(f32),
    Int64(i64),
    String(String),
    Tensor(TensorData),
}

impl AttributeValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorData> {
        match self {
            AttributeValue::Tensor(value) => Some(value),
            _ => None,
        }
    }
}

pub type Attributes = HashMap<String, AttributeValue>;

/// Supported ONNX operators.
///
/// See: <https://github.com/onnx/onnx/blob/main/docs/Operators.md>
#[derive(Debug, Hash, Eq, PartialEq, EnumString, Clone, Copy, Display)]
pub enum NodeType {
    Add,
    Constant,
    Div,
    Erf,
    Gelu,
    Mul,
    Sqrt,
    Sub,
}

/// A node of the traced computation graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// The type of the node. This is a valid ONNX operator.
    pub node_type: NodeType,

    /// The name of the node.
    pub name: String,

    /// The inputs of the node.
    pub inputs: Vec<Argument>,

    /// The outputs of the node.
    pub outputs: Vec<Argument>,

    /// ONNX attributes (opset-specific parameters).
    pub attrs: Attributes,
}

/// ONNX graph representation built by the tracer.
#[derive(Debug, Clone)]
pub struct OnnxGraph {
    /// The nodes of the graph, in execution order.
    pub nodes: Vec<Node>,

    /// The inputs of the graph.
    pub inputs: Vec<Argument>,

    /// The outputs of the graph.
    pub outputs: Vec<Argument>,

    /// Tensor data embedded in the graph, keyed by argument name.
    pub initializers: HashMap<String, TensorData>,
}

impl OnnxGraph {
    /// Rename a value, rewriting every reference to it: graph endpoints,
    /// node arguments, and initializer keys.
    pub fn rename_value(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        for arg in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if arg.name == old {
                arg.name = new.to_string();
            }
        }
        for node in self.nodes.iter_mut() {
            for arg in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
                if arg.name == old {
                    arg.name = new.to_string();
                }
            }
        }
        if let Some(data) = self.initializers.remove(old) {
            self.initializers.insert(new.to_string(), data);
        }
    }
}
