use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tensor::Tensor;

/// The input tensor data and shape, and expected output data for the
/// computational graph, as floats.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelInput {
    /// Inputs to the model / computational graph.
    pub input_data: Vec<Vec<f32>>,

    /// The shape of said inputs. May be omitted, in which case each input
    /// is treated as one-dimensional.
    #[serde(default)]
    pub input_shapes: Vec<Vec<usize>>,

    /// The expected output of the model (can be empty if outputs are not
    /// being constrained).
    #[serde(default)]
    pub output_data: Vec<Vec<f32>>,
}

/// Deserializes the sample input at `path` and builds a tensor from the
/// first `input_data` entry.
pub fn load_input(path: &Path) -> Result<Tensor, Error> {
    info!("loading input from {}", path.display());
    let mut file = File::open(path)?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let input: ModelInput = serde_json::from_str(&data)?;

    let row = input
        .input_data
        .first()
        .ok_or_else(|| Error::InvalidInput("input_data is empty".to_string()))?;

    match input.input_shapes.first() {
        Some(shape) => Tensor::new(row.clone(), shape.clone()),
        None => Ok(Tensor::from_vec(row.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("input.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_first_row_as_1d_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(
            dir.path(),
            r#"{"input_data": [[-1.0, 0.0, 1.0, 2.0], [9.0, 9.0]]}"#,
        );
        let tensor = load_input(&path).unwrap();
        assert_eq!(tensor.shape, vec![4]);
        assert_eq!(tensor.data, vec![-1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn honors_declared_input_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(
            dir.path(),
            r#"{"input_data": [[1.0, 2.0, 3.0, 4.0]], "input_shapes": [[2, 2]]}"#,
        );
        let tensor = load_input(&path).unwrap();
        assert_eq!(tensor.shape, vec![2, 2]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_input(&dir.path().join("input.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn wrongly_typed_input_data_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(dir.path(), r#"{"input_data": "not-an-array"}"#);
        assert!(matches!(load_input(&path), Err(Error::Json(_))));
    }

    #[test]
    fn empty_input_data_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(dir.path(), r#"{"input_data": []}"#);
        assert!(matches!(load_input(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn inconsistent_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(
            dir.path(),
            r#"{"input_data": [[1.0, 2.0, 3.0]], "input_shapes": [[2, 2]]}"#,
        );
        assert!(matches!(load_input(&path), Err(Error::InvalidInput(_))));
    }
}
