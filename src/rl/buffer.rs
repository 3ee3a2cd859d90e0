//! Experience replay memory for DQN training
//!
//! Stores past transitions in a bounded FIFO and hands out uniformly sampled
//! minibatches so that consecutive updates see decorrelated data.

use std::collections::VecDeque;

use rand::Rng;

use super::observation::Observation;

/// One recorded step of interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: usize,
    pub reward: f32,
    pub next_observation: Observation,
    pub done: bool,
}

impl Transition {
    pub fn new(
        observation: Observation,
        action: usize,
        reward: f32,
        next_observation: Observation,
        done: bool,
    ) -> Self {
        Self {
            observation,
            action,
            reward,
            next_observation,
            done,
        }
    }
}

/// A sampled minibatch, split into parallel sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionBatch {
    pub observations: Vec<Observation>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_observations: Vec<Observation>,
    pub dones: Vec<bool>,
}

impl TransitionBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            next_observations: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, transition: &Transition) {
        self.observations.push(transition.observation);
        self.actions.push(transition.action);
        self.rewards.push(transition.reward);
        self.next_observations.push(transition.next_observation);
        self.dones.push(transition.done);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Bounded replay memory with oldest-first eviction
///
/// # Example
///
/// ```rust
/// use ml_traffic::rl::{ReplayBuffer, Transition};
/// use rand::{SeedableRng, rngs::StdRng};
///
/// let mut buffer = ReplayBuffer::new(2);
/// for i in 0..3 {
///     buffer.add(Transition::new([0.0; 6], i, -1.0, [0.0; 6], false));
/// }
///
/// // The first transition was evicted
/// assert_eq!(buffer.len(), 2);
/// assert_eq!(buffer.iter().next().unwrap().action, 1);
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let batch = buffer.sample(2, &mut rng);
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    /// Create an empty buffer holding at most `capacity` transitions
    pub fn new(capacity: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest one when full
    pub fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() >= self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Sample `batch_size` distinct transitions uniformly at random
    ///
    /// # Panics
    ///
    /// Panics if fewer than `batch_size` transitions are stored. Callers
    /// check `len()` first.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> TransitionBatch {
        assert!(
            batch_size <= self.transitions.len(),
            "cannot sample {} transitions from a buffer holding {}",
            batch_size,
            self.transitions.len()
        );

        let mut batch = TransitionBatch::with_capacity(batch_size);
        for idx in rand::seq::index::sample(rng, self.transitions.len(), batch_size) {
            batch.push(&self.transitions[idx]);
        }

        batch
    }

    /// Get the number of stored transitions
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate from the oldest to the newest transition
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    fn transition(tag: usize) -> Transition {
        let obs = [tag as f32, 0.0, 0.0, 0.0, 0.0, 0.0];
        let next = [tag as f32 + 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        Transition::new(obs, tag % 3, -(tag as f32), next, tag % 2 == 0)
    }

    #[test]
    fn test_buffer_new() {
        let buffer = ReplayBuffer::new(100);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 100);
    }

    #[test]
    fn test_buffer_add() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.add(transition(0));
        buffer.add(transition(1));

        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut buffer = ReplayBuffer::new(5);
        for i in 0..50 {
            buffer.add(transition(i));
            assert!(buffer.len() <= 5);
        }
        assert!(buffer.is_full());
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..5 {
            buffer.add(transition(i));
        }

        let kept: Vec<f32> = buffer.iter().map(|t| t.observation[0]).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut buffer = ReplayBuffer::new(0);
        buffer.add(transition(0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sample_returns_distinct_entries() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..40 {
            buffer.add(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(3);

        let batch = buffer.sample(32, &mut rng);

        assert_eq!(batch.len(), 32);
        let tags: HashSet<u32> = batch.observations.iter().map(|o| o[0] as u32).collect();
        assert_eq!(tags.len(), 32);
    }

    #[test]
    fn test_sample_keeps_fields_aligned() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..20 {
            buffer.add(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(11);

        let batch = buffer.sample(20, &mut rng);

        for i in 0..batch.len() {
            let tag = batch.observations[i][0] as usize;
            assert_eq!(batch.actions[i], tag % 3);
            assert_eq!(batch.rewards[i], -(tag as f32));
            assert_eq!(batch.next_observations[i][0], tag as f32 + 1.0);
            assert_eq!(batch.dones[i], tag % 2 == 0);
        }
    }

    #[test]
    fn test_sample_only_from_live_entries() {
        let mut buffer = ReplayBuffer::new(4);
        for i in 0..10 {
            buffer.add(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(5);

        let batch = buffer.sample(4, &mut rng);

        for obs in &batch.observations {
            assert!(obs[0] >= 6.0);
        }
    }

    #[test]
    #[should_panic(expected = "cannot sample")]
    fn test_sample_underflow_panics() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.add(transition(0));
        let mut rng = StdRng::seed_from_u64(0);
        buffer.sample(2, &mut rng);
    }

    #[test]
    fn test_buffer_clear() {
        let mut buffer = ReplayBuffer::new(10);
        for i in 0..10 {
            buffer.add(transition(i));
        }
        assert!(buffer.is_full());

        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 10);
    }
}
