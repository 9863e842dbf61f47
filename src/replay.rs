//! Bounded experience-replay buffer.

use std::collections::VecDeque;

use rand::rngs::StdRng;

use crate::state::StateKey;

/// A single stored transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Experience {
    pub state: StateKey,
    pub action: usize,
    pub reward: f64,
    pub next_state: StateKey,
    pub done: bool,
}

/// FIFO replay buffer with a fixed capacity.
///
/// When a push would exceed capacity the oldest experience is evicted
/// first. Sampling is uniform without replacement within one batch.
#[derive(Debug)]
pub struct ReplayBuffer {
    experiences: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    /// Creates an empty buffer holding at most `capacity` experiences.
    pub fn new(capacity: usize) -> Self {
        Self {
            experiences: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an experience, evicting the oldest one at capacity.
    pub fn push(&mut self, experience: Experience) {
        if self.experiences.len() >= self.capacity {
            self.experiences.pop_front();
        }
        self.experiences.push_back(experience);
    }

    /// Number of stored experiences.
    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    /// Returns true if the buffer holds no experiences.
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }

    /// Maximum number of stored experiences.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the buffer still holds the given experience.
    pub fn contains(&self, experience: &Experience) -> bool {
        self.experiences.contains(experience)
    }

    /// Draws `amount` distinct experiences uniformly at random.
    ///
    /// `amount` must not exceed the current length; callers gate on
    /// [`ReplayBuffer::len`] before sampling.
    pub fn sample(&self, rng: &mut StdRng, amount: usize) -> Vec<Experience> {
        rand::seq::index::sample(rng, self.experiences.len(), amount)
            .iter()
            .map(|i| self.experiences[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn key(tag: u8) -> StateKey {
        StateKey::new(tag % 5, tag % 5, false, false, &[false], 100, &[0])
    }

    fn exp(tag: u8) -> Experience {
        Experience {
            state: key(tag),
            action: (tag % 6) as usize,
            reward: tag as f64,
            next_state: key(tag.wrapping_add(1)),
            done: false,
        }
    }

    #[test]
    fn push_and_len() {
        let mut buf = ReplayBuffer::new(10);
        assert!(buf.is_empty());
        buf.push(exp(1));
        buf.push(exp(2));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn capacity_bound_evicts_oldest() {
        let mut buf = ReplayBuffer::new(1000);
        let oldest = Experience {
            reward: -12345.0,
            ..exp(0)
        };
        buf.push(oldest);
        for i in 0..1000u32 {
            buf.push(Experience {
                reward: i as f64,
                ..exp((i % 200) as u8)
            });
        }
        assert_eq!(buf.len(), 1000);
        assert!(!buf.contains(&oldest));
    }

    #[test]
    fn sample_is_without_replacement() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..50u8 {
            buf.push(exp(i));
        }
        let mut rng = StdRng::seed_from_u64(0);
        let batch = buf.sample(&mut rng, 32);
        assert_eq!(batch.len(), 32);
        // Rewards are unique per experience; no duplicates means no
        // within-batch replacement.
        let mut rewards: Vec<u64> = batch.iter().map(|e| e.reward as u64).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 32);
    }
}
