use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Error;
use crate::ir::{
    ArgType, Argument, AttributeValue, Attributes, Node, NodeType, OnnxGraph, TensorData,
    TensorType,
};
use crate::tensor::Tensor;

/// Mutable state shared between a [`Tracer`] and the [`Value`] handles it
/// hands out. Operations on values append nodes here as they execute.
#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<Node>,
    inputs: Vec<Argument>,
    initializers: HashMap<String, TensorData>,
    counters: HashMap<NodeType, usize>,
}

impl GraphState {
    /// Produce a fresh node name, e.g. "gelu1", "add2". Counters are
    /// per-operator so trace order fully determines naming.
    fn node_name(&mut self, node_type: NodeType) -> String {
        let counter = self.counters.entry(node_type).or_insert(0);
        *counter += 1;
        format!("{}{}", node_type.to_string().to_lowercase(), counter)
    }
}

/// Records the operations a model performs on sample data, building a
/// static graph representation from the dynamic execution.
pub struct Tracer {
    state: Rc<RefCell<GraphState>>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(GraphState::default())),
        }
    }

    /// Register a graph input with the type observed on the sample tensor.
    pub fn input(&self, name: impl Into<String>, sample: &Tensor) -> Value {
        let arg = Argument::new(
            name,
            ArgType::Tensor(TensorType {
                elem_type: crate::ir::ElementType::Float32,
                rank: sample.rank(),
                static_shape: Some(sample.shape.clone()),
            }),
        );
        self.state.borrow_mut().inputs.push(arg.clone());
        Value {
            name: arg.name,
            ty: arg.ty,
            state: self.state.clone(),
        }
    }

    /// Record a `Constant` node carrying the given tensor data.
    pub fn constant(&self, data: TensorData) -> Value {
        let mut state = self.state.borrow_mut();
        let name = state.node_name(NodeType::Constant);
        let output = Argument::new(format!("{name}_out1"), data.tensor_type());
        let mut attrs = Attributes::new();
        attrs.insert("value".to_string(), AttributeValue::Tensor(data));
        state.nodes.push(Node {
            node_type: NodeType::Constant,
            name,
            inputs: vec![],
            outputs: vec![output.clone()],
            attrs,
        });
        drop(state);
        Value {
            name: output.name,
            ty: output.ty,
            state: self.state.clone(),
        }
    }

    /// Finish the trace, turning the recorded nodes into a graph with the
    /// given values as outputs.
    pub fn finish(self, outputs: &[Value]) -> Result<OnnxGraph, Error> {
        for value in outputs {
            if !Rc::ptr_eq(&value.state, &self.state) {
                return Err(Error::Trace(format!(
                    "output '{}' was produced by a different trace",
                    value.name
                )));
            }
        }
        let state = self.state.borrow();
        Ok(OnnxGraph {
            nodes: state.nodes.clone(),
            inputs: state.inputs.clone(),
            outputs: outputs
                .iter()
                .map(|value| Argument::new(value.name.clone(), value.ty.clone()))
                .collect(),
            initializers: state.initializers.clone(),
        })
    }
}

/// A handle to a tensor flowing through a trace. Operations on values both
/// describe the computation and append the corresponding node to the graph.
#[derive(Debug, Clone)]
pub struct Value {
    name: String,
    ty: ArgType,
    state: Rc<RefCell<GraphState>>,
}

impl Value {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ArgType {
        &self.ty
    }

    /// Applies the exact (non-approximated) GELU activation.
    pub fn gelu(&self) -> Value {
        let mut attrs = Attributes::new();
        attrs.insert(
            "approximate".to_string(),
            AttributeValue::String("none".to_string()),
        );
        self.unary(NodeType::Gelu, attrs)
    }

    /// Applies the Gauss error function element-wise.
    pub fn erf(&self) -> Value {
        self.unary(NodeType::Erf, Attributes::new())
    }

    /// Element-wise square root.
    pub fn sqrt(&self) -> Value {
        self.unary(NodeType::Sqrt, Attributes::new())
    }

    pub fn add(&self, rhs: &Value) -> Value {
        self.binary(NodeType::Add, rhs)
    }

    pub fn sub(&self, rhs: &Value) -> Value {
        self.binary(NodeType::Sub, rhs)
    }

    pub fn mul(&self, rhs: &Value) -> Value {
        self.binary(NodeType::Mul, rhs)
    }

    pub fn div(&self, rhs: &Value) -> Value {
        self.binary(NodeType::Div, rhs)
    }

    /// Record an elementwise unary node. The output type is the same as the
    /// input type.
    fn unary(&self, node_type: NodeType, attrs: Attributes) -> Value {
        let mut state = self.state.borrow_mut();
        let name = state.node_name(node_type);
        let output = Argument::new(format!("{name}_out1"), self.ty.clone());
        state.nodes.push(Node {
            node_type,
            name,
            inputs: vec![Argument::new(self.name.clone(), self.ty.clone())],
            outputs: vec![output.clone()],
            attrs,
        });
        drop(state);
        Value {
            name: output.name,
            ty: output.ty,
            state: self.state.clone(),
        }
    }

    /// Record an elementwise binary node. Broadcasting picks the higher-rank
    /// operand's type for the output.
    fn binary(&self, node_type: NodeType, rhs: &Value) -> Value {
        assert!(
            Rc::ptr_eq(&self.state, &rhs.state),
            "cannot combine values from different traces"
        );
        let output_ty = if rhs.ty.rank() > self.ty.rank() {
            rhs.ty.clone()
        } else {
            self.ty.clone()
        };
        let mut state = self.state.borrow_mut();
        let name = state.node_name(node_type);
        let output = Argument::new(format!("{name}_out1"), output_ty);
        state.nodes.push(Node {
            node_type,
            name,
            inputs: vec![
                Argument::new(self.name.clone(), self.ty.clone()),
                Argument::new(rhs.name.clone(), rhs.ty.clone()),
            ],
            outputs: vec![output.clone()],
            attrs: Attributes::new(),
        });
        drop(state);
        Value {
            name: output.name,
            ty: output.ty,
            state: self.state.clone(),
        }
    }
}
