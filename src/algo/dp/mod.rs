mod policy_iteration;
mod value_iteration;

pub use policy_iteration::{PolicyIteration, PolicyIterationReport};
pub use value_iteration::ValueIteration;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Hashable;
use crate::{
    ensure_interval, ensure_positive,
    env::{DiscreteAction, Model},
    rollout::Policy,
    util::argmax,
    Result,
};

/// Configuration shared by the dynamic programming solvers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DpConfig {
    /// Discount factor, in `(0, 1)`
    pub gamma: f64,
    /// A sweep whose largest value change is below this has converged
    pub tolerance: f64,
    /// Upper bound on sweeps (and on improvement rounds for policy iteration)
    pub max_iterations: usize,
}

impl Default for DpConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            tolerance: 1e-8,
            max_iterations: 7_000,
        }
    }
}

impl DpConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_interval!(self.gamma, 0.0 < _ < 1.0);
        ensure_positive!(self.tolerance);
        ensure_positive!(self.max_iterations);
        Ok(())
    }
}

/// Outcome of an iterative sweep loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    /// Number of sweeps performed
    pub iterations: usize,
    /// Largest value change in the final sweep
    pub delta: f64,
    /// Whether `delta` fell below the tolerance before the iteration cap
    pub converged: bool,
}

/// State value estimates; unseen states read as zero
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable<S: Hashable> {
    values: HashMap<S, f64>,
}

impl<S: Hashable> Default for ValueTable<S> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<S: Hashable> ValueTable<S> {
    pub fn get(&self, state: &S) -> f64 {
        self.values.get(state).copied().unwrap_or_default()
    }

    pub fn set(&mut self, state: S, value: f64) {
        self.values.insert(state, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &f64)> {
        self.values.iter()
    }
}

/// A deterministic policy stored as a lookup table
///
/// States missing from the table take the lowest-index action.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularPolicy<S: Hashable, A: DiscreteAction> {
    actions: HashMap<S, A>,
}

impl<S: Hashable, A: DiscreteAction> Default for TabularPolicy<S, A> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }
}

impl<S: Hashable, A: DiscreteAction> TabularPolicy<S, A> {
    /// The same action in every given state
    pub fn uniform(states: impl IntoIterator<Item = S>, action: A) -> Self {
        Self {
            actions: states.into_iter().map(|s| (s, action)).collect(),
        }
    }

    /// Set the action for `state`, returning the previous one
    pub fn set(&mut self, state: S, action: A) -> Option<A> {
        self.actions.insert(state, action)
    }

    pub fn get(&self, state: &S) -> Option<A> {
        self.actions.get(state).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &A)> {
        self.actions.iter()
    }
}

impl<S: Hashable, A: DiscreteAction> Policy<S, A> for TabularPolicy<S, A> {
    fn act(&self, state: &S) -> A {
        self.get(state).unwrap_or(A::ALL[0])
    }
}

/// One-step lookahead: `r(s, a) + γ·V(s')`
fn action_value<E>(
    env: &E,
    values: &ValueTable<E::State>,
    state: &E::State,
    action: E::Action,
    gamma: f64,
) -> f64
where
    E: Model,
    E::State: Hashable,
{
    let (next, reward) = env.peek(state, action);
    reward + gamma * values.get(&next)
}

/// The best action in `state` under `values` and its one-step value
///
/// Ties go to the lowest action index.
fn greedy<E>(
    env: &E,
    values: &ValueTable<E::State>,
    state: &E::State,
    gamma: f64,
) -> (E::Action, f64)
where
    E: Model,
    E::State: Hashable,
    E::Action: DiscreteAction,
{
    let q = <E::Action as DiscreteAction>::ALL
        .iter()
        .map(|&a| action_value(env, values, state, a, gamma))
        .collect::<Vec<_>>();
    let best = argmax(&q).unwrap_or(0);
    (<E::Action as DiscreteAction>::ALL[best], q[best])
}

/// Greedy policy with respect to `values` for every state of `env`
pub fn extract_policy<E>(
    env: &E,
    values: &ValueTable<E::State>,
    gamma: f64,
) -> TabularPolicy<E::State, E::Action>
where
    E: Model,
    E::State: Hashable,
    E::Action: DiscreteAction,
{
    TabularPolicy {
        actions: env
            .states()
            .into_iter()
            .map(|s| {
                let (action, _) = greedy(env, values, &s, gamma);
                (s, action)
            })
            .collect(),
    }
}

/// Repeat synchronous sweeps of `backup` over the non-terminal states of `env`
///
/// Each sweep computes every new value from the previous sweep's table. Terminal states stay
/// at zero. Stops once the largest change drops below `config.tolerance` or after
/// `config.max_iterations` sweeps.
fn sweep_until_converged<E, F>(
    env: &E,
    values: &mut ValueTable<E::State>,
    config: &DpConfig,
    backup: F,
) -> Convergence
where
    E: Model,
    E::State: Hashable,
    F: Fn(&ValueTable<E::State>, &E::State) -> f64,
{
    let states = env
        .states()
        .into_iter()
        .filter(|s| !env.is_terminal(s))
        .collect::<Vec<_>>();

    let mut delta = f64::INFINITY;
    let mut iterations = 0;
    while iterations < config.max_iterations {
        let mut next = values.clone();
        delta = 0.0;
        for s in &states {
            let v = backup(values, s);
            delta = delta.max((v - values.get(s)).abs());
            next.set(*s, v);
        }
        *values = next;
        iterations += 1;
        log::trace!("Sweep {iterations}: delta = {delta:e}");

        if delta < config.tolerance {
            return Convergence {
                iterations,
                delta,
                converged: true,
            };
        }
    }

    Convergence {
        iterations,
        delta,
        converged: false,
    }
}
