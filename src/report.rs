use serde::{Deserialize, Serialize};

use crate::ds::RingBuffer;

/// Summary of one training episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// Episode number, counting from the agent's episode offset
    pub episode: u32,
    /// Number of environment steps taken
    pub steps: usize,
    /// Sum of rewards received
    pub total_reward: f64,
    /// Exploration rate used during the episode
    pub epsilon: f64,
    /// Number of states in the action-value table after the episode
    pub states: usize,
}

/// Mean over a trailing window of values
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: RingBuffer<f64>,
}

impl MovingAverage {
    /// **Panics** if `window` is zero
    pub fn new(window: usize) -> Self {
        Self {
            window: RingBuffer::with_capacity(window),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.window.push(value);
    }

    /// Mean of the values currently in the window, or `None` before the first push
    pub fn mean(&self) -> Option<f64> {
        (!self.window.is_empty())
            .then(|| self.window.view().iter().sum::<f64>() / self.window.len() as f64)
    }

    /// Whether the window has been filled at least once
    pub fn is_warm(&self) -> bool {
        self.window.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_trails() {
        let mut avg = MovingAverage::new(2);
        assert_eq!(avg.mean(), None);

        avg.push(1.0);
        assert_eq!(avg.mean(), Some(1.0));
        assert!(!avg.is_warm());

        avg.push(3.0);
        avg.push(5.0);
        assert_eq!(avg.mean(), Some(4.0), "Only the last two values count");
        assert!(avg.is_warm());
    }
}
