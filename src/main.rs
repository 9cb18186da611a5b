use std::path::Path;
use std::process;

use log::error;

fn main() {
    env_logger::init();
    if let Err(err) = onnx_export::generate(Path::new("input.json"), Path::new("network.onnx")) {
        error!("{err}");
        process::exit(1);
    }
}
