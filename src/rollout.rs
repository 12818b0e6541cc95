use log::debug;

use crate::env::Environment;

/// A deterministic decision rule
pub trait Policy<S, A> {
    /// The action to take in `state`
    fn act(&self, state: &S) -> A;
}

impl<S, A, F> Policy<S, A> for F
where
    F: Fn(&S) -> A,
{
    fn act(&self, state: &S) -> A {
        self(state)
    }
}

/// The trajectory produced by replaying a policy
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout<S> {
    /// Every visited state, starting with the reset state
    pub states: Vec<S>,
    /// Sum of rewards received
    pub total_reward: f64,
    /// Whether the environment signalled termination before the step limit
    pub reached_goal: bool,
}

impl<S> Rollout<S> {
    /// Number of steps taken
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }
}

/// Reset `env` and follow `policy` until the episode ends or `max_steps` steps have been taken
pub fn run_policy<E, P>(env: &mut E, policy: &P, max_steps: usize) -> Rollout<E::State>
where
    E: Environment,
    E::State: Clone,
    P: Policy<E::State, E::Action>,
{
    let mut state = env.reset();
    let mut rollout = Rollout {
        states: vec![state.clone()],
        total_reward: 0.0,
        reached_goal: false,
    };

    for _ in 0..max_steps {
        let action = policy.act(&state);
        let (next, reward, done) = env.step(action);
        rollout.states.push(next.clone());
        rollout.total_reward += reward;
        state = next;

        if done {
            rollout.reached_goal = true;
            break;
        }
    }

    debug!(
        "Rollout finished after {} steps (done: {}, return: {})",
        rollout.steps(),
        rollout.reached_goal,
        rollout.total_reward
    );
    rollout
}
