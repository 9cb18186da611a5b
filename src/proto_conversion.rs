use protobuf::{Enum, EnumOrUnknown, MessageField};

use crate::export::ExportConfig;
use crate::ir::{
    ArgType, Argument, AttributeValue, Data, ElementType, Node, OnnxGraph, TensorData,
};
use crate::protos::{
    attribute_proto::AttributeType, tensor_proto::DataType, tensor_shape_proto::dimension,
    tensor_shape_proto::Dimension, type_proto, AttributeProto, GraphProto, ModelProto, NodeProto,
    OperatorSetIdProto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// ONNX IR version written into exported models. Version 9 covers opset 20.
const IR_VERSION: i64 = 9;

/// Convert an element type to the ONNX protobuf data type code.
fn element_type_to_proto(elem_type: ElementType) -> i32 {
    match elem_type {
        ElementType::Float32 => DataType::FLOAT.value(),
        ElementType::Float64 => DataType::DOUBLE.value(),
        ElementType::Int32 => DataType::INT32.value(),
        ElementType::Int64 => DataType::INT64.value(),
        ElementType::Bool => DataType::BOOL.value(),
    }
}

/// Convert tensor data to an ONNX initializer/attribute tensor.
fn tensor_data_to_proto(name: &str, data: &TensorData) -> TensorProto {
    let mut proto = TensorProto::new();
    proto.name = name.to_string();
    proto.dims = data.shape.iter().map(|&d| d as i64).collect();
    proto.data_type = element_type_to_proto(data.elem_type());
    match &data.data {
        Data::Float32s(values) => proto.float_data = values.clone(),
        Data::Int64s(values) => proto.int64_data = values.clone(),
    }
    proto
}

/// Convert a graph endpoint to a `ValueInfoProto`, declaring the axes named
/// in `dynamic_axes` as symbolic `dim_param` dimensions instead of the fixed
/// sizes recorded at trace time.
fn argument_to_value_info(arg: &Argument, config: &ExportConfig) -> ValueInfoProto {
    let dynamic = config.dynamic_axes.get(&arg.name);

    let mut tensor = type_proto::Tensor::new();
    tensor.elem_type = element_type_to_proto(arg.ty.elem_type());

    if let ArgType::Tensor(tensor_ty) = &arg.ty {
        let mut shape = TensorShapeProto::new();
        for axis in 0..tensor_ty.rank {
            let mut dim = Dimension::new();
            if let Some(param) = dynamic.and_then(|axes| axes.get(&axis)) {
                dim.value = Some(dimension::Value::DimParam(param.clone()));
            } else if let Some(static_shape) = &tensor_ty.static_shape {
                dim.value = Some(dimension::Value::DimValue(static_shape[axis] as i64));
            }
            shape.dim.push(dim);
        }
        tensor.shape = MessageField::some(shape);
    }

    let mut ty = TypeProto::new();
    ty.value = Some(type_proto::Value::TensorType(tensor));

    let mut info = ValueInfoProto::new();
    info.name = arg.name.clone();
    info.type_ = MessageField::some(ty);
    info
}

fn attribute_to_proto(name: &str, value: &AttributeValue) -> AttributeProto {
    let mut proto = AttributeProto::new();
    proto.name = name.to_string();
    match value {
        AttributeValue::Float32(v) => {
            proto.type_ = EnumOrUnknown::new(AttributeType::FLOAT);
            proto.f = *v;
        }
        AttributeValue::Int64(v) => {
            proto.type_ = EnumOrUnknown::new(AttributeType::INT);
            proto.i = *v;
        }
        AttributeValue::String(v) => {
            proto.type_ = EnumOrUnknown::new(AttributeType::STRING);
            proto.s = v.as_bytes().to_vec();
        }
        AttributeValue::Tensor(v) => {
            proto.type_ = EnumOrUnknown::new(AttributeType::TENSOR);
            proto.t = MessageField::some(tensor_data_to_proto("", v));
        }
    }
    proto
}

fn node_to_proto(node: &Node) -> NodeProto {
    let mut proto = NodeProto::new();
    proto.name = node.name.clone();
    proto.op_type = node.node_type.to_string();
    proto.input = node.inputs.iter().map(|arg| arg.name.clone()).collect();
    proto.output = node.outputs.iter().map(|arg| arg.name.clone()).collect();
    // Attributes are sorted by name so repeated exports are byte-identical.
    let mut attrs: Vec<(&String, &AttributeValue)> = node.attrs.iter().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    proto.attribute = attrs
        .into_iter()
        .map(|(name, value)| attribute_to_proto(name, value))
        .collect();
    proto
}

/// Convert the traced graph into a serializable ONNX model.
pub fn graph_to_model(graph: &OnnxGraph, config: &ExportConfig) -> ModelProto {
    let mut graph_proto = GraphProto::new();
    graph_proto.name = "main_graph".to_string();
    graph_proto.node = graph.nodes.iter().map(node_to_proto).collect();
    graph_proto.input = graph
        .inputs
        .iter()
        .map(|arg| argument_to_value_info(arg, config))
        .collect();
    graph_proto.output = graph
        .outputs
        .iter()
        .map(|arg| argument_to_value_info(arg, config))
        .collect();

    let mut initializers: Vec<(&String, &TensorData)> = graph.initializers.iter().collect();
    initializers.sort_by(|a, b| a.0.cmp(b.0));
    if config.export_params {
        graph_proto.initializer = initializers
            .into_iter()
            .map(|(name, data)| tensor_data_to_proto(name, data))
            .collect();
    } else {
        // Without embedded parameters the stored values become additional
        // graph inputs the consumer has to feed.
        for (name, data) in initializers {
            let arg = Argument::new(name.clone(), data.tensor_type());
            graph_proto
                .input
                .push(argument_to_value_info(&arg, config));
        }
    }

    let mut opset = OperatorSetIdProto::new();
    opset.domain = String::new();
    opset.version = config.opset_version;

    let mut model = ModelProto::new();
    model.ir_version = IR_VERSION;
    model.producer_name = env!("CARGO_PKG_NAME").to_string();
    model.producer_version = env!("CARGO_PKG_VERSION").to_string();
    model.opset_import = vec![opset];
    model.graph = MessageField::some(graph_proto);
    model
}
