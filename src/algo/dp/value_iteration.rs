use log::{info, warn};

use super::{
    extract_policy, greedy, sweep_until_converged, Convergence, DpConfig, TabularPolicy, ValueTable,
};
use crate::{
    algo::Hashable,
    env::{DiscreteAction, Model},
    rollout::{self, Rollout},
    Result,
};

/// A value iteration agent
///
/// Repeatedly applies the Bellman optimality backup `V(s) ← max_a [r(s,a) + γ·V(s')]` to every
/// non-terminal state, then reads off the greedy policy. Requires a [`Model`] of the environment.
#[derive(Debug, Clone)]
pub struct ValueIteration<S: Hashable, A: DiscreteAction> {
    config: DpConfig,
    state_value: ValueTable<S>,
    policy: TabularPolicy<S, A>,
}

impl<S: Hashable, A: DiscreteAction> ValueIteration<S, A> {
    /// Initialize a new `ValueIteration` agent with all values at zero
    pub fn new(config: DpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state_value: ValueTable::default(),
            policy: TabularPolicy::default(),
        })
    }

    /// Sweep until the values converge or the iteration cap is hit
    ///
    /// Continues from the current value table. Hitting the cap is logged and reported, and the
    /// values reached so far are kept.
    pub fn iterate<E>(&mut self, env: &E) -> Convergence
    where
        E: Model<State = S, Action = A>,
    {
        let gamma = self.config.gamma;
        let convergence = sweep_until_converged(env, &mut self.state_value, &self.config, |v, s| {
            greedy(env, v, s, gamma).1
        });

        if convergence.converged {
            info!(
                "Value iteration converged after {} sweeps (delta {:e})",
                convergence.iterations, convergence.delta
            );
        } else {
            warn!(
                "Value iteration stopped at the cap of {} sweeps without converging (delta {:e})",
                convergence.iterations, convergence.delta
            );
        }

        convergence
    }

    /// Replace the policy with the greedy policy for the current values
    pub fn extract_policy<E>(&mut self, env: &E) -> &TabularPolicy<S, A>
    where
        E: Model<State = S, Action = A>,
    {
        self.policy = extract_policy(env, &self.state_value, self.config.gamma);
        &self.policy
    }

    /// [`iterate`](Self::iterate), then [`extract_policy`](Self::extract_policy)
    pub fn solve<E>(&mut self, env: &E) -> Convergence
    where
        E: Model<State = S, Action = A>,
    {
        let convergence = self.iterate(env);
        self.extract_policy(env);
        convergence
    }

    /// Deploy the extracted policy into the environment
    pub fn run_policy<E>(&self, env: &mut E, max_steps: usize) -> Rollout<S>
    where
        E: Model<State = S, Action = A>,
    {
        rollout::run_policy(env, &self.policy, max_steps)
    }

    /// Get the agent's policy
    pub fn policy(&self) -> &TabularPolicy<S, A> {
        &self.policy
    }

    /// Get the agent's state value function
    pub fn state_value(&self) -> &ValueTable<S> {
        &self.state_value
    }

    pub fn config(&self) -> &DpConfig {
        &self.config
    }
}
