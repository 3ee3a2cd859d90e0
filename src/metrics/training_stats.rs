//! Training statistics tracking for DQN
//!
//! Rolling-window averages over episode rewards, lengths and final queue
//! sizes, plus per-update loss and the current exploration rate.

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust
/// use ml_traffic::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
///
/// stats.record_episode(-1520.4, 201, 38);
/// stats.record_update(12.5, 0.61);
///
/// assert_eq!(stats.total_episodes(), 1);
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Episode rewards (rolling window)
    episode_rewards: VecDeque<f32>,

    /// Episode lengths in steps (rolling window)
    episode_lengths: VecDeque<usize>,

    /// Vehicles left waiting when each episode ended (rolling window)
    final_queues: VecDeque<usize>,

    /// TD losses (rolling window)
    losses: VecDeque<f32>,

    /// Most recent exploration rate
    epsilon: f64,

    total_episodes: usize,

    total_steps: usize,

    total_updates: usize,

    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker averaging over the last `window_size` values
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            final_queues: VecDeque::with_capacity(window_size),
            losses: VecDeque::with_capacity(window_size),
            epsilon: 1.0,
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record the completion of an episode
    ///
    /// # Arguments
    ///
    /// * `reward` - Total reward accumulated during the episode
    /// * `length` - Number of environment steps taken
    /// * `final_queue` - Total vehicles present when the episode ended
    pub fn record_episode(&mut self, reward: f32, length: usize, final_queue: usize) {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        Self::push_deque(&mut self.final_queues, final_queue, self.window_size);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Record one training update
    pub fn record_update(&mut self, loss: f32, epsilon: f64) {
        Self::push_deque(&mut self.losses, loss, self.window_size);
        self.epsilon = epsilon;
        self.total_updates += 1;
    }

    /// Mean episode reward over the window, or 0.0 before any episode
    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean(&self.episode_rewards)
    }

    /// Best episode reward still inside the window
    pub fn best_episode_reward(&self) -> Option<f32> {
        self.episode_rewards.iter().copied().reduce(f32::max)
    }

    pub fn mean_episode_length(&self) -> f32 {
        Self::mean_count(&self.episode_lengths)
    }

    pub fn mean_final_queue(&self) -> f32 {
        Self::mean_count(&self.final_queues)
    }

    /// Mean TD loss over the window, or 0.0 before any update
    pub fn mean_loss(&self) -> f32 {
        Self::mean(&self.losses)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line summary of the current statistics
    ///
    /// ```text
    /// Episodes: 1 | Steps: 201 | Reward: -1520.40 | Queue: 38.0 | Len: 201.0 | Loss: 12.5000 | Epsilon: 0.61
    /// ```
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Steps: {} | Reward: {:.2} | Queue: {:.1} | Len: {:.1} | Loss: {:.4} | Epsilon: {:.2}",
            self.total_episodes,
            self.total_steps,
            self.mean_episode_reward(),
            self.mean_final_queue(),
            self.mean_episode_length(),
            self.mean_loss(),
            self.epsilon,
        )
    }

    fn mean(deque: &VecDeque<f32>) -> f32 {
        if deque.is_empty() {
            0.0
        } else {
            deque.iter().sum::<f32>() / deque.len() as f32
        }
    }

    fn mean_count(deque: &VecDeque<usize>) -> f32 {
        if deque.is_empty() {
            0.0
        } else {
            deque.iter().sum::<usize>() as f32 / deque.len() as f32
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if window_size == 0 {
            return;
        }
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
