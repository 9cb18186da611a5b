use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use protobuf::Message;

use crate::error::Error;
use crate::fold::fold_constants;
use crate::input::load_input;
use crate::nn::{Gelu, Module};
use crate::proto_conversion::graph_to_model;
use crate::tensor::Tensor;
use crate::trace::Tracer;

/// Options recognized by [`export`], mirroring the standard model-export
/// surface: parameter embedding, constant folding, endpoint naming, and
/// dynamic axis declarations.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Store parameter values inside the model file. When false, stored
    /// values are emitted as extra graph inputs instead.
    pub export_params: bool,

    /// Execute constant folding before serialization.
    pub fold_constants: bool,

    /// Logical names for the graph inputs. Only the first entry is used;
    /// the models this crate traces have a single input.
    pub input_names: Vec<String>,

    /// Logical names for the graph outputs.
    pub output_names: Vec<String>,

    /// Per endpoint name, axis index to axis name. Named axes are exported
    /// as variable-length dimensions rather than fixed sizes.
    pub dynamic_axes: HashMap<String, HashMap<usize, String>>,

    /// ONNX opset to declare. Defaults to 20, the first opset with a
    /// dedicated Gelu operator.
    pub opset_version: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_params: true,
            fold_constants: true,
            input_names: vec![],
            output_names: vec![],
            dynamic_axes: HashMap::new(),
            opset_version: 20,
        }
    }
}

/// Trace `model` once on `sample_input` and serialize the resulting
/// computation graph to `output_path`, overwriting any existing file.
pub fn export<M: Module>(
    model: &M,
    sample_input: &Tensor,
    output_path: &Path,
    config: &ExportConfig,
) -> Result<(), Error> {
    let input_name = config
        .input_names
        .first()
        .map(String::as_str)
        .unwrap_or("input");

    let tracer = Tracer::new();
    let input = tracer.input(input_name, sample_input);
    let output = model.forward(input);
    let mut graph = tracer.finish(&[output])?;

    for (index, name) in config.output_names.iter().enumerate() {
        if let Some(arg) = graph.outputs.get(index) {
            let old = arg.name.clone();
            graph.rename_value(&old, name);
        }
    }

    if config.fold_constants {
        fold_constants(&mut graph)?;
    }

    let model_proto = graph_to_model(&graph, config);

    info!("saving model to {}", output_path.display());
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    model_proto.write_to_writer(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// The whole fixture-generation flow: load the sample input at
/// `input_path`, trace a [`Gelu`] model on it, and export the graph to
/// `output_path` with `input`/`output` endpoint names and a dynamic
/// `batch_size` axis on axis 0 of both.
pub fn generate(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let sample = load_input(input_path)?;
    let model = Gelu::new();
    let config = ExportConfig {
        input_names: vec!["input".to_string()],
        output_names: vec!["output".to_string()],
        dynamic_axes: HashMap::from([
            (
                "input".to_string(),
                HashMap::from([(0, "batch_size".to_string())]),
            ),
            (
                "output".to_string(),
                HashMap::from([(0, "batch_size".to_string())]),
            ),
        ]),
        ..ExportConfig::default()
    };
    export(&model, &sample, output_path, &config)
}
