use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::intersection::{IntersectionConfig, IntersectionState};

/// Number of components in an observation
pub const OBSERVATION_DIM: usize = 6;

/// Fixed-size observation vector
///
/// Components:
/// - 0..4: vehicle counts for N, S, E, W
/// - 4: signal phase (0 = NS green, 1 = EW green)
/// - 5: phase time scaled by `phase_time_scale`
pub type Observation = [f32; OBSERVATION_DIM];

/// Create an observation from intersection state
pub fn create_observation(state: &IntersectionState, config: &IntersectionConfig) -> Observation {
    let [n, s, e, w] = state.lane_counts();
    [
        n as f32,
        s as f32,
        e as f32,
        w as f32,
        state.signal.as_index() as f32,
        state.phase_time as f32 * config.phase_time_scale,
    ]
}

/// Stack observations into a `[batch, OBSERVATION_DIM]` tensor
pub fn observations_to_tensor<B: Backend>(
    observations: &[Observation],
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Vec<f32> = observations.iter().flatten().copied().collect();
    let tensor_data = TensorData::new(data, [observations.len(), OBSERVATION_DIM]);

    Tensor::<B, 2>::from_data(tensor_data, device)
}
