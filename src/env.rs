use std::{fmt::Debug, hash::Hash};

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent.
/// Nothing is assumed about whether the dynamics can be queried in advance; see [`Model`]
/// for environments that expose them.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** `(next_state, reward, done)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f64, bool);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// A finite, ordered set of actions
///
/// The position of an action in [`ALL`](DiscreteAction::ALL) is its index. Greedy selection
/// breaks ties in favor of the lowest index.
pub trait DiscreteAction: Copy + Eq + Hash + Debug + 'static {
    /// Every action, ordered by index
    const ALL: &'static [Self];

    /// The index of this action in [`ALL`](DiscreteAction::ALL)
    fn index(self) -> usize;

    /// Number of actions in the set
    fn count() -> usize {
        Self::ALL.len()
    }

    /// Look up an action by index
    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// An environment with a finite, enumerable state space
pub trait DiscreteStateSpace: Environment {
    /// Every reachable state, in a fixed order
    fn states(&self) -> Vec<Self::State>;
}

/// An environment whose transition and reward functions can be queried without stepping it
///
/// Required by the dynamic programming solvers in [`algo::dp`](crate::algo::dp).
pub trait Model: DiscreteStateSpace {
    /// Evaluate the transition from `state` under `action` without mutating the environment
    ///
    /// **Returns** `(next_state, reward)`
    fn peek(&self, state: &Self::State, action: Self::Action) -> (Self::State, f64);

    /// Whether `state` ends an episode
    fn is_terminal(&self, state: &Self::State) -> bool;
}
