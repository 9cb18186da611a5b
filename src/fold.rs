use std::collections::HashSet;

use log::debug;

use crate::error::Error;
use crate::ir::{Node, NodeType, OnnxGraph, TensorData};
use crate::tensor::{activation, Tensor};

/// Pre-evaluate constant subexpressions of the traced graph.
///
/// `Constant` nodes become initializers, and any node whose inputs are all
/// initializers is evaluated at export time and replaced by an initializer
/// holding its result. Initializers that end up unreferenced are dropped.
pub fn fold_constants(graph: &mut OnnxGraph) -> Result<(), Error> {
    // Absorb Constant nodes into the initializer set first.
    let mut nodes = Vec::with_capacity(graph.nodes.len());
    for node in graph.nodes.drain(..) {
        if node.node_type == NodeType::Constant {
            let data = node
                .attrs
                .get("value")
                .and_then(|attr| attr.as_tensor())
                .ok_or_else(|| {
                    Error::Fold(format!("constant node '{}' has no value", node.name))
                })?;
            debug!("folding constant node '{}' into initializer", node.name);
            graph
                .initializers
                .insert(node.outputs[0].name.clone(), data.clone());
        } else {
            nodes.push(node);
        }
    }

    // Evaluate nodes fed entirely by initializers until a fixpoint. Nodes
    // are stored in execution order, so a single forward sweep suffices.
    let mut remaining = Vec::with_capacity(nodes.len());
    for node in nodes {
        let constant_fed = node
            .inputs
            .iter()
            .all(|input| graph.initializers.contains_key(&input.name));
        if constant_fed && !node.inputs.is_empty() {
            let result = evaluate(&node, graph)?;
            debug!("folded node '{}' ({})", node.name, node.node_type);
            graph.initializers.insert(node.outputs[0].name.clone(), result);
        } else {
            remaining.push(node);
        }
    }
    graph.nodes = remaining;

    // Drop initializers nothing references anymore.
    let referenced: HashSet<&str> = graph
        .nodes
        .iter()
        .flat_map(|node| node.inputs.iter())
        .chain(graph.outputs.iter())
        .map(|arg| arg.name.as_str())
        .collect();
    graph
        .initializers
        .retain(|name, _| referenced.contains(name.as_str()));

    Ok(())
}

/// Evaluate a single node on initializer data.
fn evaluate(node: &Node, graph: &OnnxGraph) -> Result<TensorData, Error> {
    let inputs: Vec<Tensor> = node
        .inputs
        .iter()
        .map(|input| Tensor::from(&graph.initializers[&input.name]))
        .collect();

    let output = match node.node_type {
        NodeType::Add => inputs[0].zip(&inputs[1], |a, b| a + b)?,
        NodeType::Sub => inputs[0].zip(&inputs[1], |a, b| a - b)?,
        NodeType::Mul => inputs[0].zip(&inputs[1], |a, b| a * b)?,
        NodeType::Div => inputs[0].zip(&inputs[1], |a, b| a / b)?,
        NodeType::Erf => activation::erf(&inputs[0]),
        NodeType::Sqrt => inputs[0].map(f32::sqrt),
        NodeType::Gelu => {
            let approximate = node
                .attrs
                .get("approximate")
                .and_then(|attr| attr.as_string())
                .unwrap_or("none");
            if approximate != "none" {
                return Err(Error::Fold(format!(
                    "gelu approximation '{approximate}' is not supported"
                )));
            }
            activation::gelu(&inputs[0])
        }
        NodeType::Constant => {
            return Err(Error::Fold(
                "constant nodes are absorbed before evaluation".to_string(),
            ))
        }
    };

    Ok(TensorData::from(&output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Data;
    use crate::trace::Tracer;

    #[test]
    fn constant_expression_folds_to_initializer() {
        let tracer = Tracer::new();
        let input = tracer.input("input", &Tensor::from_vec(vec![1.0, 2.0]));
        let half = tracer.constant(TensorData::new_f32(vec![0.5], vec![1]));
        let two = tracer.constant(TensorData::new_f32(vec![2.0], vec![1]));
        // (0.5 * 2.0) is constant, the final mul depends on the input.
        let scale = half.mul(&two);
        let output = input.mul(&scale);
        let mut graph = tracer.finish(&[output]).unwrap();
        assert_eq!(graph.nodes.len(), 4);

        fold_constants(&mut graph).unwrap();

        // Only the input-dependent mul survives, fed by one initializer.
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].node_type, NodeType::Mul);
        assert_eq!(graph.initializers.len(), 1);
        let folded = &graph.initializers["mul1_out1"];
        assert_eq!(folded.data, Data::Float32s(vec![1.0]));
    }

    #[test]
    fn runtime_only_graph_is_untouched() {
        let tracer = Tracer::new();
        let input = tracer.input("input", &Tensor::from_vec(vec![1.0]));
        let output = input.gelu();
        let mut graph = tracer.finish(&[output]).unwrap();

        fold_constants(&mut graph).unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.initializers.is_empty());
    }

    #[test]
    fn fully_constant_output_is_kept_as_initializer() {
        let tracer = Tracer::new();
        let value = tracer.constant(TensorData::new_f32(vec![4.0], vec![1]));
        let output = value.sqrt();
        let mut graph = tracer.finish(&[output]).unwrap();

        fold_constants(&mut graph).unwrap();

        assert!(graph.nodes.is_empty());
        let folded = &graph.initializers["sqrt1_out1"];
        assert_eq!(folded.data, Data::Float32s(vec![2.0]));
    }
}
