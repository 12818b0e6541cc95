use log::{debug, info, warn};

use super::{
    action_value, greedy, sweep_until_converged, Convergence, DpConfig, TabularPolicy, ValueTable,
};
use crate::{
    algo::Hashable,
    env::{DiscreteAction, Model},
    rollout::{self, Policy, Rollout},
    Result,
};

/// Summary of a [`PolicyIteration::solve`] run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyIterationReport {
    /// Number of evaluate/improve rounds performed
    pub rounds: usize,
    /// Total evaluation sweeps across all rounds
    pub sweeps: usize,
    /// Whether the final improvement left the policy unchanged
    pub stable: bool,
}

/// A policy iteration agent
///
/// Alternates full evaluation of the current policy with greedy improvement until the policy
/// stops changing. As a dynamic programming method it requires a [`Model`] of the environment.
/// The policy starts out taking the lowest-index action everywhere.
#[derive(Debug, Clone)]
pub struct PolicyIteration<S: Hashable, A: DiscreteAction> {
    config: DpConfig,
    state_value: ValueTable<S>,
    policy: TabularPolicy<S, A>,
}

impl<S: Hashable, A: DiscreteAction> PolicyIteration<S, A> {
    /// Initialize a new `PolicyIteration` agent
    pub fn new(config: DpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state_value: ValueTable::default(),
            policy: TabularPolicy::default(),
        })
    }

    /// Solve `V(s) = r(s, P(s)) + γ·V(s')` for the current policy by iterative sweeps
    ///
    /// Uses the same stopping rule as value iteration, starting from the current values.
    pub fn evaluate<E>(&mut self, env: &E) -> Convergence
    where
        E: Model<State = S, Action = A>,
    {
        let gamma = self.config.gamma;
        let policy = &self.policy;
        sweep_until_converged(env, &mut self.state_value, &self.config, |v, s| {
            action_value(env, v, s, policy.act(s), gamma)
        })
    }

    /// Make the policy greedy with respect to the current values
    ///
    /// **Returns** `true` if no state's action changed
    pub fn improve<E>(&mut self, env: &E) -> bool
    where
        E: Model<State = S, Action = A>,
    {
        let mut stable = true;
        for state in env.states() {
            let (action, _) = greedy(env, &self.state_value, &state, self.config.gamma);
            if self.policy.set(state, action) != Some(action) {
                stable = false;
            }
        }

        stable
    }

    /// Run the policy iteration algorithm until the policy is stable or the iteration cap is hit
    pub fn solve<E>(&mut self, env: &E) -> PolicyIterationReport
    where
        E: Model<State = S, Action = A>,
    {
        if self.policy.is_empty() {
            self.policy = TabularPolicy::uniform(env.states(), A::ALL[0]);
        }

        let mut report = PolicyIterationReport {
            rounds: 0,
            sweeps: 0,
            stable: false,
        };

        while report.rounds < self.config.max_iterations {
            let convergence = self.evaluate(env);
            report.sweeps += convergence.iterations;
            if !convergence.converged {
                warn!(
                    "Policy evaluation hit the cap of {} sweeps (delta {:e})",
                    convergence.iterations, convergence.delta
                );
            }

            report.rounds += 1;
            report.stable = self.improve(env);
            debug!(
                "Round {}: evaluated in {} sweeps, stable: {}",
                report.rounds, convergence.iterations, report.stable
            );

            if report.stable {
                info!(
                    "Policy iteration converged after {} rounds ({} sweeps)",
                    report.rounds, report.sweeps
                );
                return report;
            }
        }

        warn!(
            "Policy iteration stopped at the cap of {} rounds with the policy still changing",
            report.rounds
        );
        report
    }

    /// Deploy the current policy into the environment
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
