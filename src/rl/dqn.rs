//! DQN agent with experience replay and a periodically synced target network
//!
//! The online network lives on the autodiff backend and is the only thing the
//! optimizer touches. The target network lives on the inner backend, so it
//! cannot take part in backpropagation; it is replaced wholesale with a copy
//! of the online weights every `update_target_freq` training steps.

use burn::{
    module::AutodiffModule,
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{ElementConversion, Int, Tensor, backend::AutodiffBackend},
};
use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::buffer::{ReplayBuffer, Transition, TransitionBatch};
use super::config::DqnConfig;
use super::network::{QNetwork, QNetworkConfig};
use super::observation::{Observation, observations_to_tensor};
use crate::error::{TrafficError, TrafficResult};
use crate::intersection::SignalAction;

/// Outcome of one completed training step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainStep {
    /// Mean squared TD error of the sampled batch
    pub loss: f32,
    /// Exploration probability after decay
    pub epsilon: f64,
    /// Whether the target network was refreshed on this step
    pub target_synced: bool,
}

/// Deep Q-learning agent
///
/// # Type Parameters
///
/// * `B` - Autodiff backend for the online network
/// * `R` - Random source used for exploration and minibatch sampling
///
/// # Example
///
/// ```rust
/// use ml_traffic::rl::{DqnAgent, DqnConfig, TrainingBackend, default_device};
///
/// let mut agent = DqnAgent::<TrainingBackend>::seeded(DqnConfig::default(), default_device(), 0)?;
///
/// let obs = [0.0; 6];
/// let action = agent.act(&obs);
/// agent.remember(obs, action, -1.0, obs, false);
///
/// // Not enough transitions yet: training is skipped
/// assert!(agent.train().is_none());
/// # Ok::<(), ml_traffic::TrafficError>(())
/// ```
pub struct DqnAgent<B: AutodiffBackend, R: Rng = StdRng> {
    /// Network being optimized
    online: QNetwork<B>,

    /// Frozen copy used only to compute learning targets
    target: QNetwork<B::InnerBackend>,

    /// Adam optimizer for the online network
    optim: OptimizerAdaptor<Adam, QNetwork<B>, B>,

    config: DqnConfig,

    /// Replay memory
    memory: ReplayBuffer,

    /// Current exploration probability
    epsilon: f64,

    /// Completed training steps
    steps: usize,

    rng: R,

    device: B::Device,
}

impl<B: AutodiffBackend> DqnAgent<B, StdRng> {
    /// Create an agent whose exploration and sampling are determined by `seed`
    pub fn seeded(config: DqnConfig, device: B::Device, seed: u64) -> TrafficResult<Self> {
        Self::new(config, device, StdRng::seed_from_u64(seed))
    }

    /// Create an agent seeded from operating system entropy
    pub fn from_entropy(config: DqnConfig, device: B::Device) -> TrafficResult<Self> {
        Self::new(config, device, StdRng::from_entropy())
    }
}

impl<B: AutodiffBackend, R: Rng> DqnAgent<B, R> {
    /// Create a new agent
    ///
    /// The target network starts as an exact copy of the online network.
    pub fn new(config: DqnConfig, device: B::Device, rng: R) -> TrafficResult<Self> {
        config.validate().map_err(TrafficError::InvalidConfig)?;

        let online = QNetworkConfig::new()
            .with_hidden_sizes(config.hidden_sizes)
            .init::<B>(&device);
        let target = online.valid();
        let optim = AdamConfig::new().init();
        let memory = ReplayBuffer::new(config.buffer_capacity);

        Ok(Self {
            online,
            target,
            optim,
            epsilon: config.epsilon_start,
            config,
            memory,
            steps: 0,
            rng,
            device,
        })
    }

    /// Epsilon-greedy action selection
    ///
    /// With probability `epsilon` returns a uniformly random action, otherwise
    /// the greedy action under the online network.
    pub fn act(&mut self, observation: &Observation) -> usize {
        if self.rng.r#gen::<f64>() < self.epsilon {
            self.rng.gen_range(0..SignalAction::COUNT)
        } else {
            self.greedy_action(observation)
        }
    }

    /// Action with the highest online Q-value; ties go to the lowest index
    pub fn greedy_action(&self, observation: &Observation) -> usize {
        argmax_first(&self.q_values(observation))
    }

    /// Online network's action values for a single observation
    pub fn q_values(&self, observation: &Observation) -> Vec<f32> {
        let network = self.online.valid();
        let input = observations_to_tensor::<B::InnerBackend>(&[*observation], &self.device);

        network.forward(input).into_data().iter::<f32>().collect()
    }

    /// Store a transition in replay memory
    pub fn remember(
        &mut self,
        observation: Observation,
        action: usize,
        reward: f32,
        next_observation: Observation,
        done: bool,
    ) {
        self.memory.add(Transition::new(
            observation,
            action,
            reward,
            next_observation,
            done,
        ));
    }

    /// Perform one DQN update
    ///
    /// Returns `None` without touching any state while memory holds fewer
    /// than `batch_size` transitions.
    pub fn train(&mut self) -> Option<TrainStep> {
        if self.memory.len() < self.config.batch_size {
            return None;
        }

        let batch = self.memory.sample(self.config.batch_size, &mut self.rng);

        // Targets come from the inner-backend network, so no gradient reaches it
        let targets = self.compute_targets(&batch);
        let targets: Tensor<B, 1> = Tensor::from_floats(targets.as_slice(), &self.device);

        let observations: Tensor<B, 2> = observations_to_tensor(&batch.observations, &self.device);
        let actions_data: Vec<i32> = batch.actions.iter().map(|&a| a as i32).collect();
        let actions = Tensor::<B, 1, Int>::from_ints(actions_data.as_slice(), &self.device);

        // Q(s, a) for the actions actually taken: [batch]
        let current_q = self
            .online
            .forward(observations)
            .gather(1, actions.unsqueeze_dim(1))
            .squeeze::<1>(1);

        let diff = current_q - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.online);
        self.online = self
            .optim
            .step(self.config.learning_rate, self.online.clone(), grads);

        self.steps += 1;
        let target_synced = self.steps % self.config.update_target_freq == 0;
        if target_synced {
            self.sync_target();
            debug!("target network synced at training step {}", self.steps);
        }

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        Some(TrainStep {
            loss: loss_value,
            epsilon: self.epsilon,
            target_synced,
        })
    }

    /// `r + γ · max_a Q_target(s', a) · (1 − done)` for every transition
    pub(crate) fn compute_targets(&self, batch: &TransitionBatch) -> Vec<f32> {
        let next_observations =
            observations_to_tensor::<B::InnerBackend>(&batch.next_observations, &self.device);
        let max_next_q = self.target.forward(next_observations).max_dim(1).into_data();

        batch
            .rewards
            .iter()
            .zip(&batch.dones)
            .zip(max_next_q.iter::<f32>())
            .map(|((&reward, &done), next_q)| {
                let mask = if done { 0.0 } else { 1.0 };
                reward + self.config.gamma * next_q * mask
            })
            .collect()
    }

    /// Overwrite the target network with the current online weights
    pub fn sync_target(&mut self) {
        self.target = self.online.valid();
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of completed training steps
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn online_parameters(&self) -> Vec<f32> {
        self.online.flat_parameters()
    }

    pub fn target_parameters(&self) -> Vec<f32> {
        self.target.flat_parameters()
    }
}

/// Index of the first maximum
fn argmax_first(values: &[f32]) -> usize {
    let mut best = 0;
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = idx;
        }
    }
    best
}
