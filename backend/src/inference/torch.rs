use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use tch::{CModule, Device, IValue, Kind, Tensor};

use super::{ClassifierBackend, InferenceError};

/// TorchScript module pinned to the best available device.
pub struct TorchModule {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModule {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(path, device)
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl ClassifierBackend for TorchModule {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let contiguous = input.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| InferenceError::Preprocessing("input tensor is not contiguous".into()))?;
        let tensor = Tensor::from_slice(data)
            .reshape(shape.as_slice())
            .to_device(self.device);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
            tch::no_grad(|| module.forward_is(&[IValue::Tensor(tensor)]))
                .map_err(|e| InferenceError::Model(e.to_string()))?
        };

        // Hugging Face exports return `(logits, ...)` tuples.
        let logits = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(mut items) if !items.is_empty() => match items.swap_remove(0) {
                IValue::Tensor(t) => t,
                other => {
                    return Err(InferenceError::Model(format!(
                        "unexpected model output: {:?}",
                        other
                    )));
                }
            },
            other => {
                return Err(InferenceError::Model(format!(
                    "unexpected model output: {:?}",
                    other
                )));
            }
        };

        let flat = logits.to_kind(Kind::Float).to_device(Device::Cpu).view([-1]);
        let num_elements = flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}
