use rand::Rng;

use crate::decay::Decay;

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// Randomness is supplied by the caller so that a seeded generator replays the same choices.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// The exploration rate for the given episode
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode)
    }

    /// Invoke epsilon greedy policy for current episode
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon(episode) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::decay::{Constant, Geometric};

    #[test]
    fn zero_epsilon_always_exploits() {
        let policy = EpsilonGreedy::new(Constant::new(0.0));
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| policy.choose(0, &mut rng) == Choice::Exploit));
    }

    #[test]
    fn full_epsilon_always_explores() {
        let policy = EpsilonGreedy::new(Constant::new(1.0));
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| policy.choose(0, &mut rng) == Choice::Explore));
    }

    #[test]
    fn explore_rate_tracks_epsilon() {
        let policy = EpsilonGreedy::new(Constant::new(0.25));
        let mut rng = StdRng::seed_from_u64(11);
        let explored = (0..20_000)
            .filter(|_| policy.choose(0, &mut rng) == Choice::Explore)
            .count();
        let rate = explored as f64 / 20_000.0;
        assert!((rate - 0.25).abs() < 0.02, "Observed explore rate {rate}");
    }

    #[test]
    fn same_seed_same_choices() {
        let policy = EpsilonGreedy::new(Geometric::new(0.9, 0.5, 0.05).unwrap());
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50u32)
                .map(|t| policy.choose(t, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }
}
