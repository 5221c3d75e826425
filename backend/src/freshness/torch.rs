use ndarray::Array4;
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::classifier::{Classifier, InferenceError};
use crate::config::DeviceChoice;

/// TorchScript classifier exported from the training pipeline.
///
/// The module sits behind a `Mutex`: forward passes are serialized across
/// request workers.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(path: &Path, choice: DeviceChoice) -> Result<Self, InferenceError> {
        let device = match choice {
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Cuda => Device::Cuda(0),
            DeviceChoice::Auto => Device::cuda_if_available(),
        };

        let mut model = CModule::load_on_device(path, device)
            .map_err(|e| InferenceError::Backend(format!("loading {}: {e}", path.display())))?;
        model.set_eval();
        log::info!("Loaded TorchScript classifier {} on {:?}", path.display(), device);

        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn name(&self) -> &str {
        "torchscript"
    }

    fn infer(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let (n, c, h, w) = batch.dim();
        let data = batch
            .as_slice()
            .ok_or_else(|| InferenceError::Shape("input tensor is not contiguous".into()))?;
        let input = Tensor::from_slice(data)
            .view([n as i64, c as i64, h as i64, w as i64])
            .to_device(self.device);

        let model = self
            .model
            .lock()
            .map_err(|_| InferenceError::Backend("model lock poisoned".into()))?;
        let output = tch::no_grad(|| model.forward_ts(&[input]))
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        let probs = output
            .softmax(-1, Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = probs.size()[0] as usize;
        let mut scores = vec![0.0f32; num_elements];
        probs.copy_data(&mut scores, num_elements);
        Ok(scores)
    }
}
