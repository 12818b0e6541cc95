use std::marker::PhantomData;

use log::{debug, error, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::QTable;
use crate::{
    algo::Hashable,
    decay::Geometric,
    discretize::Discretizer,
    ensure_interval, ensure_positive,
    env::{DiscreteAction, Environment},
    exploration::{Choice, EpsilonGreedy},
    persist::TableStore,
    report::{EpisodeReport, MovingAverage},
    rollout::Policy,
    Error, Result,
};

/// Episodes averaged in the trailing reward logged by [`QLearningAgent::train`]
const REWARD_WINDOW: usize = 20;

/// Configuration for the [`QLearningAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QLearningAgentConfig {
    /// Learning rate, in `(0, 1]`
    pub alpha: f64,
    /// Discount factor, in `(0, 1)`
    pub gamma: f64,
    /// Exploration rate of the first episode
    pub epsilon: f64,
    /// Floor of the exploration rate
    pub epsilon_min: f64,
    /// Per-episode multiplier of the exploration rate
    pub epsilon_decay: f64,
    /// Step cap per episode
    pub max_steps: usize,
    /// Seed of the exploration stream
    pub seed: u64,
}

impl Default for QLearningAgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.1,
            epsilon_min: 0.01,
            epsilon_decay: 0.98,
            max_steps: 10_000,
            seed: 0,
        }
    }
}

impl QLearningAgentConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_interval!(self.alpha, 0.0 < _ <= 1.0);
        ensure_interval!(self.gamma, 0.0 < _ < 1.0);
        ensure_interval!(self.epsilon, 0.0 <= _ <= 1.0);
        ensure_interval!(self.epsilon_min, 0.0 <= _ <= 1.0);
        ensure_positive!(self.max_steps);
        Ok(())
    }
}

/// A single transition, already mapped to table states
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp<S, A> {
    /// The state before taking the action
    pub state: S,
    /// The action taken in `state`
    pub action: A,
    /// The reward received for the transition
    pub reward: f64,
    /// The state after the action
    pub next_state: S,
}

/// A Q-learning agent that keeps one action-value row per discretized state
///
/// Observations from the environment pass through a [`Discretizer`] before they touch the
/// table. Actions are chosen epsilon-greedily, with epsilon decaying geometrically per episode.
/// All randomness comes from a generator seeded by [`QLearningAgentConfig::seed`].
///
/// ### Generics
/// - `D` - The [`Discretizer`] mapping raw observations to table states
/// - `A` - The environment's action set
pub struct QLearningAgent<D, A>
where
    D: Discretizer,
    D::State: Hashable,
    A: DiscreteAction,
{
    q_table: QTable<D::State>,
    discretizer: D,
    exploration: EpsilonGreedy<Geometric>,
    alpha: f64,
    gamma: f64,
    max_steps: usize,
    episode: u32,
    rng: StdRng,
    _action: PhantomData<A>,
}

impl<D, A> QLearningAgent<D, A>
where
    D: Discretizer,
    D::State: Hashable,
    A: DiscreteAction,
{
    /// Initialize a new agent with an empty table
    pub fn new(config: QLearningAgentConfig, discretizer: D) -> Result<Self> {
        config.validate()?;
        let decay = Geometric::new(config.epsilon_decay, config.epsilon, config.epsilon_min)?;
        Ok(Self {
            q_table: QTable::new(A::count()),
            discretizer,
            exploration: EpsilonGreedy::new(decay),
            alpha: config.alpha,
            gamma: config.gamma,
            max_steps: config.max_steps,
            episode: 0,
            rng: StdRng::seed_from_u64(config.seed),
            _action: PhantomData,
        })
    }

    /// Start from a previously learned table
    ///
    /// Fails if the table's rows do not match the number of actions.
    pub fn with_table(mut self, table: QTable<D::State>) -> Result<Self> {
        if table.actions() != A::count() {
            return Err(Error::CorruptTable(format!(
                "table has {} actions per state, expected {}",
                table.actions(),
                A::count()
            )));
        }
        self.q_table = table;
        Ok(self)
    }

    /// Continue episode numbering (and the epsilon schedule) from `episode`
    pub fn with_episode(mut self, episode: u32) -> Self {
        self.episode = episode;
        self
    }

    /// Choose an action in `state`, exploring with probability epsilon
    ///
    /// Exploration picks uniformly among all actions; exploitation picks the best known action,
    /// inserting a zero row for a new state.
    pub fn act(&mut self, state: D::State) -> A {
        match self.exploration.choose(self.episode, &mut self.rng) {
            Choice::Explore => A::ALL[self.rng.gen_range(0..A::count())],
            Choice::Exploit => A::ALL[self.q_table.greedy(state)],
        }
    }

    /// Apply the Q-learning update for one transition
    ///
    /// **Returns** the new action value
    pub fn learn(&mut self, exp: Exp<D::State, A>) -> f64 {
        let Exp {
            state,
            action,
            reward,
            next_state,
        } = exp;
        self.q_table.update(
            state,
            action.index(),
            reward,
            next_state,
            self.alpha,
            self.gamma,
        )
    }

    /// Run one episode, learning after every step
    ///
    /// The episode ends when the environment signals termination or the step cap is reached.
    pub fn go<E>(&mut self, env: &mut E) -> EpisodeReport
    where
        E: Environment<State = D::Observation, Action = A>,
    {
        let epsilon = self.epsilon();
        let mut state = self.discretizer.discretize(&env.reset());
        let mut steps = 0;
        let mut total_reward = 0.0;

        while steps < self.max_steps {
            let action = self.act(state);
            let (observation, reward, done) = env.step(action);
            let next_state = self.discretizer.discretize(&observation);
            self.learn(Exp {
                state,
                action,
                reward,
                next_state,
            });

            state = next_state;
            total_reward += reward;
            steps += 1;

            if done {
                break;
            }
        }

        let report = EpisodeReport {
            episode: self.episode,
            steps,
            total_reward,
            epsilon,
            states: self.q_table.len(),
        };
        info!(
            "Episode {}: {} steps, reward {}, epsilon {:.4}, {} states",
            report.episode, report.steps, report.total_reward, report.epsilon, report.states
        );

        self.episode += 1;
        report
    }

    /// Run `episodes` episodes, restoring the table from `store` first and saving after each
    ///
    /// A table that fails to load is logged and replaced by the agent's current table, and a
    /// failed save is logged without stopping training.
    pub fn train<E, T>(&mut self, env: &mut E, episodes: u32, store: &mut T) -> Vec<EpisodeReport>
    where
        E: Environment<State = D::Observation, Action = A>,
        T: TableStore<D::State>,
    {
        match store.load() {
            Ok(Some(table)) if table.actions() == A::count() => {
                info!("Restored action-value table with {} states", table.len());
                self.q_table = table;
            }
            Ok(Some(table)) => warn!(
                "Ignoring stored table with {} actions per state, expected {}",
                table.actions(),
                A::count()
            ),
            Ok(None) => info!("No stored action-value table, starting fresh"),
            Err(e) => warn!("Failed to load action-value table, starting fresh: {e}"),
        }

        let mut average = MovingAverage::new(REWARD_WINDOW);
        let mut reports = Vec::with_capacity(episodes as usize);
        for _ in 0..episodes {
            let report = self.go(env);
            average.push(report.total_reward);
            if let Some(mean) = average.mean() {
                debug!("Trailing mean reward over {REWARD_WINDOW} episodes: {mean:.2}");
            }

            if let Err(e) = store.save(&self.q_table) {
                error!(
                    "Failed to save action-value table after episode {}: {e}",
                    report.episode
                );
            }
            reports.push(report);
        }

        reports
    }

    /// The best known action in `state`, without exploring or inserting
    pub fn greedy_action(&self, state: &D::State) -> A {
        A::ALL[self.q_table.greedy_readonly(state)]
    }

    /// An exploitation-only policy over raw observations
    pub fn greedy_policy(&self) -> impl Policy<D::Observation, A> + '_ {
        move |observation: &D::Observation| {
            self.greedy_action(&self.discretizer.discretize(observation))
        }
    }

    /// The exploration rate of the current episode
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon(self.episode)
    }

    /// Number of episodes run, including the starting offset
    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn q_table(&self) -> &QTable<D::State> {
        &self.q_table
    }

    pub fn discretizer(&self) -> &D {
        &self.discretizer
    }
}

#[cfg(test)]
mod tests {
    use strum::VariantArray;

    use super::*;
    use crate::persist::MemoryStore;

    const GOAL: usize = 3;

    #[derive(VariantArray, Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Move {
        Left,
        Right,
    }

    impl DiscreteAction for Move {
        const ALL: &'static [Self] = Self::VARIANTS;

        fn index(self) -> usize {
            self as usize
        }
    }

    /// Positions `0..=GOAL`; reaching the goal pays 10, every other step costs 1
    struct Corridor {
        position: usize,
    }

    impl Environment for Corridor {
        type State = usize;
        type Action = Move;

        fn step(&mut self, action: Move) -> (usize, f64, bool) {
            self.position = match action {
                Move::Left => self.position.saturating_sub(1),
                Move::Right => self.position + 1,
            };
            if self.position == GOAL {
                (self.position, 10.0, true)
            } else {
                (self.position, -1.0, false)
            }
        }

        fn reset(&mut self) -> usize {
            self.position = 0;
            0
        }
    }

    struct Identity;

    impl Discretizer for Identity {
        type Observation = usize;
        type State = usize;

        fn discretize(&self, observation: &usize) -> usize {
            *observation
        }
    }

    struct FailingStore;

    impl TableStore<usize> for FailingStore {
        fn load(&mut self) -> Result<Option<QTable<usize>>> {
            Err(Error::CorruptTable("unreadable".into()))
        }

        fn save(&mut self, _table: &QTable<usize>) -> Result<()> {
            Err(Error::CorruptTable("read-only".into()))
        }
    }

    fn config() -> QLearningAgentConfig {
        QLearningAgentConfig {
            alpha: 0.5,
            max_steps: 100,
            seed: 7,
            ..Default::default()
        }
    }

    fn agent() -> QLearningAgent<Identity, Move> {
        QLearningAgent::new(config(), Identity).unwrap()
    }

    #[test]
    fn invalid_config_fails_fast() {
        let bad = [
            QLearningAgentConfig {
                alpha: 0.0,
                ..Default::default()
            },
            QLearningAgentConfig {
                gamma: 1.0,
                ..Default::default()
            },
            QLearningAgentConfig {
                epsilon_decay: 1.5,
                ..Default::default()
            },
            QLearningAgentConfig {
                epsilon: 0.005,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                QLearningAgent::<Identity, Move>::new(config, Identity).is_err(),
                "{config:?} accepted"
            );
        }
    }

    #[test]
    fn learns_to_walk_right() {
        let mut agent = agent();
        let mut env = Corridor { position: 0 };
        let mut store = MemoryStore::new();
        let reports = agent.train(&mut env, 200, &mut store);

        assert_eq!(reports.len(), 200);
        assert_eq!(agent.episode(), 200);
        for s in 0..GOAL {
            assert_eq!(agent.greedy_action(&s), Move::Right, "Wrong action at {s}");
        }

        let rollout = crate::rollout::run_policy(&mut env, &agent.greedy_policy(), 10);
        assert!(rollout.reached_goal);
        assert_eq!(rollout.steps(), GOAL);
    }

    #[test]
    fn table_is_saved_after_every_episode() {
        let mut agent = agent();
        let mut env = Corridor { position: 0 };
        let mut store = MemoryStore::new();
        agent.train(&mut env, 5, &mut store);

        assert_eq!(store.saves(), 5);
        assert_eq!(store.table(), Some(agent.q_table()));
    }

    #[test]
    fn training_resumes_from_store() {
        let mut env = Corridor { position: 0 };
        let mut store = MemoryStore::new();
        let mut first = agent();
        first.train(&mut env, 50, &mut store);

        let mut second = agent().with_episode(50);
        second.train(&mut env, 0, &mut store);
        assert_eq!(second.q_table(), first.q_table(), "Table restored before training");
        assert_eq!(second.epsilon(), first.epsilon(), "Schedule continues from the offset");
    }

    #[test]
    fn persistence_failures_do_not_stop_training() {
        let mut agent = agent();
        let mut env = Corridor { position: 0 };
        let reports = agent.train(&mut env, 3, &mut FailingStore);
        assert_eq!(reports.len(), 3);
        assert!(!agent.q_table().is_empty());
    }

    #[test]
    fn same_seed_same_episodes() {
        let mut env = Corridor { position: 0 };
        let mut a = agent();
        let mut b = agent();
        let ra = a.train(&mut env, 20, &mut MemoryStore::new());
        let rb = b.train(&mut env, 20, &mut MemoryStore::new());
        assert_eq!(ra, rb);
        assert_eq!(a.q_table(), b.q_table());
    }

    #[test]
    fn step_cap_ends_episode() {
        let config = QLearningAgentConfig {
            max_steps: 2,
            ..config()
        };
        let mut agent = QLearningAgent::<_, Move>::new(config, Identity).unwrap();
        let report = agent.go(&mut Corridor { position: 0 });
        assert_eq!(report.steps, 2, "Goal is three steps away");
        assert_eq!(report.episode, 0);
    }

    #[test]
    fn learn_applies_update() {
        let mut agent = agent();
        let q = agent.learn(Exp {
            state: 2,
            action: Move::Right,
            reward: 10.0,
            next_state: 3,
        });
        assert_eq!(q, 5.0, "alpha = 0.5 halves the way to the target");
        assert_eq!(agent.q_table().get(&2), Some(&[0.0, 5.0][..]));
    }

    #[test]
    fn mismatched_table_is_rejected() {
        assert!(agent().with_table(QTable::new(3)).is_err());
        assert!(agent().with_table(QTable::new(2)).is_ok());
    }
}
