//! Q-value network for the signal controller
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, 6]
//!   ↓ Linear(6 → 64) + ReLU
//!   ↓ Linear(64 → 32) + ReLU
//!   ↓ Linear(32 → 3)
//! Output: [batch, 3] action values
//! ```
//!
//! # Example
//!
//! ```rust
//! use ml_traffic::rl::QNetworkConfig;
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = NdArrayDevice::default();
//! let network = QNetworkConfig::new().init::<Backend>(&device);
//!
//! let observation = Tensor::zeros([8, 6], &device);
//! let q_values = network.forward(observation);
//!
//! assert_eq!(q_values.dims(), [8, 3]);
//! ```

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, activation::relu, backend::Backend},
};

use super::observation::OBSERVATION_DIM;
use crate::intersection::SignalAction;

/// Configuration for the Q-network
#[derive(Debug, Clone)]
pub struct QNetworkConfig {
    /// Observation size (default: 6)
    pub input_dim: usize,

    /// Widths of the two hidden layers (default: [64, 32])
    pub hidden_sizes: [usize; 2],

    /// Number of discrete actions (default: 3)
    pub num_actions: usize,
}

impl QNetworkConfig {
    /// Create a new configuration with default layer sizes
    pub fn new() -> Self {
        Self {
            input_dim: OBSERVATION_DIM,
            hidden_sizes: [64, 32],
            num_actions: SignalAction::COUNT,
        }
    }

    /// Override the hidden layer widths
    pub fn with_hidden_sizes(mut self, hidden_sizes: [usize; 2]) -> Self {
        self.hidden_sizes = hidden_sizes;
        self
    }

    /// Initialize the Q-network from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let [h1, h2] = self.hidden_sizes;

        QNetwork {
            fc1: LinearConfig::new(self.input_dim, h1).init(device),
            fc2: LinearConfig::new(h1, h2).init(device),
            output: LinearConfig::new(h2, self.num_actions).init(device),
        }
    }
}

impl Default for QNetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed-forward action-value network
///
/// Generic over the backend so the same definition serves as the online
/// network (autodiff backend) and the target network (inner backend).
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    /// No activation on the output layer
    output: Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: `[batch, input_dim]` → `[batch, num_actions]`
    pub fn forward(&self, observation: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(observation));
        let x = relu(self.fc2.forward(x));
        self.output.forward(x)
    }

    /// All weights and biases flattened in layer order
    ///
    /// Used to compare two networks parameter-for-parameter.
    pub fn flat_parameters(&self) -> Vec<f32> {
        let mut params = Vec::new();

        for layer in [&self.fc1, &self.fc2, &self.output] {
            params.extend(layer.weight.val().into_data().iter::<f32>());
            if let Some(bias) = &layer.bias {
                params.extend(bias.val().into_data().iter::<f32>());
            }
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::module::AutodiffModule;
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_forward_pass_shapes() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        for batch_size in [1, 4, 32] {
            let observation = Tensor::zeros([batch_size, 6], &device);
            let q_values = network.forward(observation);
            assert_eq!(q_values.dims(), [batch_size, 3]);
        }
    }

    #[test]
    fn test_parameter_count() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        // (6*64 + 64) + (64*32 + 32) + (32*3 + 3)
        assert_eq!(network.flat_parameters().len(), 448 + 2080 + 99);
    }

    #[test]
    fn test_custom_hidden_sizes() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new()
            .with_hidden_sizes([16, 8])
            .init::<TestBackend>(&device);

        let q_values = network.forward(Tensor::ones([2, 6], &device));
        assert_eq!(q_values.dims(), [2, 3]);
        assert_eq!(network.flat_parameters().len(), (6 * 16 + 16) + (16 * 8 + 8) + (8 * 3 + 3));
    }

    #[test]
    fn test_output_finite() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        let observation = Tensor::random([16, 6], Distribution::Uniform(0.0, 10.0), &device);
        let q_values: TensorData = network.forward(observation).into_data();

        for val in q_values.iter::<f32>() {
            assert!(val.is_finite(), "Q-values should be finite, got: {}", val);
        }
    }

    #[test]
    fn test_gradient_flow() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestAutodiffBackend>(&device);

        let observation = Tensor::ones([2, 6], &device).require_grad();
        let loss = network.forward(observation.clone()).sum();
        let gradients = loss.backward();

        assert!(
            observation.grad(&gradients).is_some(),
            "Gradients should flow back to the observation"
        );
    }

    #[test]
    fn test_valid_copy_is_identical() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestAutodiffBackend>(&device);

        let copy = network.valid();

        assert_eq!(network.flat_parameters(), copy.flat_parameters());
    }

    #[test]
    fn test_independent_inits_differ() {
        let device = NdArrayDevice::default();
        let a = QNetworkConfig::new().init::<TestBackend>(&device);
        let b = QNetworkConfig::new().init::<TestBackend>(&device);

        assert_ne!(a.flat_parameters(), b.flat_parameters());
    }

    #[test]
    fn test_batch_consistency() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new().init::<TestBackend>(&device);

        let single = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 0.0, 3.0, 1.0, 0.4]], &device);
        let batch = Tensor::cat(vec![single.clone(), single.clone(), single.clone()], 0);

        let single_vals: Vec<f32> = network.forward(single).into_data().iter::<f32>().collect();
        let batch_vals: Vec<f32> = network.forward(batch).into_data().iter::<f32>().collect();

        for j in 0..3 {
            assert!((single_vals[j] - batch_vals[j]).abs() < 1e-5);
            assert!((single_vals[j] - batch_vals[6 + j]).abs() < 1e-5);
        }
    }
}
