use ndarray::Array4;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::{CModule, Device, Kind, Tensor};

use super::error::ClassifierError;

/// A loaded network that maps a `(1, 3, H, W)` batch to one raw score per class.
pub trait InferenceEngine: Send + Sync {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError>;
}

/// Parses `cpu`, `cuda`, `cuda:N` or `mps`.
pub fn parse_device(device: &str) -> Result<Device, ClassifierError> {
    let device = device.trim().to_ascii_lowercase();
    match device.as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda(0)),
        "mps" => Ok(Device::Mps),
        other => other
            .strip_prefix("cuda:")
            .and_then(|idx| idx.parse::<usize>().ok())
            .map(Device::Cuda)
            .ok_or_else(|| ClassifierError::ModelLoad(format!("unknown device '{}'", other))),
    }
}

/// TorchScript model. The forward pass is serialized through the mutex.
#[derive(Clone)]
pub struct TorchModel {
    model: Arc<Mutex<CModule>>,
    device: Device,
}

impl TorchModel {
    pub fn load(model_path: impl AsRef<Path>, device: &str) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        let device = parse_device(device)?;
        if matches!(device, Device::Cuda(_)) && !tch::Cuda::is_available() {
            return Err(ClassifierError::ModelLoad(format!(
                "device {:?} requested but CUDA is not available",
                device
            )));
        }

        let mut model = CModule::load_on_device(model_path, device).map_err(|e| {
            ClassifierError::ModelLoad(format!("{}: {}", model_path.display(), e))
        })?;
        model.set_eval();

        log::info!("Loaded model {} on {:?}", model_path.display(), device);
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    fn to_tensor(&self, input: &Array4<f32>) -> Result<Tensor, ClassifierError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| ClassifierError::Inference("input tensor is not contiguous".into()))?;
        Ok(Tensor::from_slice(data).view(shape.as_slice()).to_device(self.device))
    }
}

impl InferenceEngine for TorchModel {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let tensor = self.to_tensor(input)?;
        let model = self
            .model
            .lock()
            .map_err(|_| ClassifierError::Inference("model lock poisoned".into()))?;

        let output = tch::no_grad(|| model.forward_ts(&[tensor]))?;
        let output_flat = output
            .detach()
            .to_device(Device::Cpu)
            .get(0)
            .to_kind(Kind::Float)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}
