//! Backend selection
//!
//! The online Q-network trains on [`TrainingBackend`]. The target network and
//! greedy action selection run on its inner backend, plain `NdArray<f32>`,
//! reached through `AutodiffModule::valid`.
//!
//! The observation is six numbers and the network has a few thousand
//! parameters, so the CPU backend is all this crate needs.

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Autodiff-enabled CPU backend used for training
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Device shared by the online and target networks
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{QNetwork, QNetworkConfig};
    use burn::module::AutodiffModule;
    use burn::tensor::Tensor;

    #[test]
    fn test_target_copy_runs_on_plain_ndarray() {
        let device = default_device();
        let online = QNetworkConfig::new().init::<TrainingBackend>(&device);
        let target: QNetwork<NdArray<f32>> = online.valid();

        let observation = [[3.0, 0.0, 5.0, 1.0, 1.0, 0.4]];
        let online_q: Tensor<NdArray<f32>, 2> = online
            .forward(Tensor::from_floats(observation, &device))
            .inner();
        let target_q = target.forward(Tensor::from_floats(observation, &device));

        assert_eq!(online_q.into_data(), target_q.into_data());
        assert_eq!(online.flat_parameters(), target.flat_parameters());
    }
}
