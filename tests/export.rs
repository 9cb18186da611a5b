use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use protobuf::Message;

use onnx_export::protos::{tensor_shape_proto::dimension, ModelProto};
use onnx_export::tensor::activation;
use onnx_export::{generate, Tensor};

const SAMPLE: &str = r#"{"input_data": [[-1.0, 0.0, 1.0, 2.0]]}"#;

fn write_input(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("input.json");
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn generate_sample(dir: &Path) -> ModelProto {
    let input_path = write_input(dir, SAMPLE);
    let output_path = dir.join("network.onnx");
    generate(&input_path, &output_path).unwrap();

    let bytes = std::fs::read(&output_path).unwrap();
    ModelProto::parse_from_bytes(&bytes).unwrap()
}

#[test]
fn exported_model_has_single_exact_gelu_node() {
    let dir = tempfile::tempdir().unwrap();
    let model = generate_sample(dir.path());
    let graph = model.graph.as_ref().unwrap();

    assert_eq!(graph.node.len(), 1);
    let node = &graph.node[0];
    assert_eq!(node.op_type, "Gelu");
    assert_eq!(node.input, vec!["input".to_string()]);
    assert_eq!(node.output, vec!["output".to_string()]);

    let approximate = node
        .attribute
        .iter()
        .find(|attr| attr.name == "approximate")
        .expect("approximate attribute");
    assert_eq!(approximate.s, b"none".to_vec());

    // No learned parameters exist, so the embedded set is empty.
    assert!(graph.initializer.is_empty());
    assert_eq!(model.opset_import[0].version, 20);
}

#[test]
fn both_endpoints_declare_dynamic_batch_axis() {
    let dir = tempfile::tempdir().unwrap();
    let model = generate_sample(dir.path());
    let graph = model.graph.as_ref().unwrap();

    assert_eq!(graph.input.len(), 1);
    assert_eq!(graph.input[0].name, "input");
    assert_eq!(graph.output.len(), 1);
    assert_eq!(graph.output[0].name, "output");

    for endpoint in graph.input.iter().chain(graph.output.iter()) {
        let dims = &endpoint.type_.as_ref().unwrap().tensor_type().shape.dim;
        assert_eq!(dims.len(), 1, "{} should stay rank 1", endpoint.name);
        assert_eq!(
            dims[0].value,
            Some(dimension::Value::DimParam("batch_size".to_string())),
            "axis 0 of {} should be the batch_size dynamic axis",
            endpoint.name
        );
    }
}

#[test]
fn exporting_twice_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), SAMPLE);

    let first_path = dir.path().join("first.onnx");
    let second_path = dir.path().join("second.onnx");
    generate(&input_path, &first_path).unwrap();
    generate(&input_path, &second_path).unwrap();

    let first = ModelProto::parse_from_bytes(&std::fs::read(&first_path).unwrap()).unwrap();
    let second = ModelProto::parse_from_bytes(&std::fs::read(&second_path).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn export_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), SAMPLE);
    let output_path = dir.path().join("network.onnx");
    std::fs::write(&output_path, b"stale").unwrap();

    generate(&input_path, &output_path).unwrap();

    let bytes = std::fs::read(&output_path).unwrap();
    assert!(ModelProto::parse_from_bytes(&bytes).is_ok());
}

#[test]
fn missing_input_file_fails_without_producing_output() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("network.onnx");

    let result = generate(&dir.path().join("input.json"), &output_path);

    assert!(result.is_err());
    assert!(!output_path.exists());
}

#[test]
fn malformed_input_fails_without_producing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = write_input(dir.path(), r#"{"input_data": "not-an-array"}"#);
    let output_path = dir.path().join("network.onnx");

    let result = generate(&input_path, &output_path);

    assert!(result.is_err());
    assert!(!output_path.exists());
}

#[test]
fn traced_operation_matches_exact_gelu_values() {
    // The exported graph holds a single Gelu node, so the model's semantics
    // are those of the eager kernel; check it against the reference values.
    let input = Tensor::from_vec(vec![-1.0, 0.0, 1.0, 2.0]);
    let output = activation::gelu(&input);

    let expected = [-0.1587, 0.0, 0.8413, 1.9545];
    for (actual, expected) in output.data.iter().zip(expected.iter()) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }
}

#[test]
fn renamed_endpoints_and_axes_follow_the_config() {
    use onnx_export::nn::Gelu;
    use onnx_export::{export, ExportConfig};

    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("custom.onnx");
    let config = ExportConfig {
        input_names: vec!["tokens".to_string()],
        output_names: vec!["activations".to_string()],
        dynamic_axes: HashMap::from([(
            "tokens".to_string(),
            HashMap::from([(0, "seq_len".to_string())]),
        )]),
        ..ExportConfig::default()
    };

    export(
        &Gelu::new(),
        &Tensor::new(vec![0.0; 6], vec![2, 3]).unwrap(),
        &output_path,
        &config,
    )
    .unwrap();

    let model = ModelProto::parse_from_bytes(&std::fs::read(&output_path).unwrap()).unwrap();
    let graph = model.graph.as_ref().unwrap();
    assert_eq!(graph.input[0].name, "tokens");
    assert_eq!(graph.output[0].name, "activations");

    let input_dims = &graph.input[0].type_.as_ref().unwrap().tensor_type().shape.dim;
    assert_eq!(
        input_dims[0].value,
        Some(dimension::Value::DimParam("seq_len".to_string()))
    );
    assert_eq!(input_dims[1].value, Some(dimension::Value::DimValue(3)));

    // The output keeps its traced static shape: no dynamic axis was declared.
    let output_dims = &graph.output[0].type_.as_ref().unwrap().tensor_type().shape.dim;
    assert_eq!(output_dims[0].value, Some(dimension::Value::DimValue(2)));
}
