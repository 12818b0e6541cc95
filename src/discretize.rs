use serde::{Deserialize, Serialize};

use crate::{
    ensure_positive,
    gym::{obstacle_runner::ObstacleKind, Observation},
    Result,
};

/// Maps a rich observation to a finite, hashable state key
///
/// Implementations must be pure: the same observation always yields the same key.
pub trait Discretizer {
    type Observation;
    type State;

    fn discretize(&self, observation: &Self::Observation) -> Self::State;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObstacleClass {
    Low,
    High,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Posture {
    Grounded,
    Airborne,
    Ducking,
}

/// Tabular state of the obstacle runner: `(distance bucket, obstacle class, posture)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunnerState {
    pub distance: usize,
    pub obstacle: ObstacleClass,
    pub posture: Posture,
}

/// Buckets the gap to the nearest obstacle linearly over `[0, max_distance]`
///
/// With no obstacle ahead the distance is the sentinel bucket `bins`, one past the last real
/// bucket, so that "none" never shares a key with "far away".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerDiscretizer {
    bins: usize,
    max_distance: f64,
}

impl Default for RunnerDiscretizer {
    fn default() -> Self {
        Self {
            bins: 10,
            max_distance: 600.0,
        }
    }
}

impl RunnerDiscretizer {
    pub fn new(bins: usize, max_distance: f64) -> Result<Self> {
        ensure_positive!(bins);
        ensure_positive!(max_distance);
        Ok(Self { bins, max_distance })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// The distance bucket used when no obstacle is ahead
    pub fn sentinel(&self) -> usize {
        self.bins
    }

    /// `floor(ratio * (bins - 1))` of the gap clamped to `[0, max_distance]`
    pub fn bucket(&self, gap: f64) -> usize {
        let ratio = gap.clamp(0.0, self.max_distance) / self.max_distance;
        ((ratio * (self.bins - 1) as f64).floor() as usize).min(self.bins - 1)
    }
}

impl Discretizer for RunnerDiscretizer {
    type Observation = Observation;
    type State = RunnerState;

    fn discretize(&self, observation: &Observation) -> Self::State {
        let (distance, obstacle) = match observation.obstacle {
            Some(view) => (
                self.bucket(view.gap),
                match view.kind {
                    ObstacleKind::Low => ObstacleClass::Low,
                    ObstacleKind::High => ObstacleClass::High,
                },
            ),
            None => (self.sentinel(), ObstacleClass::None),
        };

        let posture = if observation.duck_timer > 0 {
            Posture::Ducking
        } else if !observation.on_ground {
            Posture::Airborne
        } else {
            Posture::Grounded
        };

        RunnerState {
            distance,
            obstacle,
            posture,
        }
    }
}
