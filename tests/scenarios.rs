use std::collections::{HashMap, VecDeque};

use tabrl::{
    algo::{
        dp::{DpConfig, PolicyIteration, ValueIteration},
        tabular::{QLearningAgent, QLearningAgentConfig},
    },
    discretize::{RunnerDiscretizer, RunnerState},
    env::DiscreteAction,
    gym::{Maze, MazeAction, ObstacleRunner, Pos, RunnerAction, RunnerConfig},
    persist::{JsonFileStore, TableStore},
    rollout::run_policy,
};

/// Length of the shortest path from the start to the goal, by breadth-first search
fn shortest_path(maze: &Maze) -> Option<usize> {
    let mut distance = HashMap::from([(maze.start(), 0)]);
    let mut queue = VecDeque::from([maze.start()]);
    while let Some(pos) = queue.pop_front() {
        let d = distance[&pos];
        if pos == maze.goal() {
            return Some(d);
        }
        for &action in MazeAction::ALL {
            let next: Pos = maze.transition(pos, action);
            if !distance.contains_key(&next) {
                distance.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    None
}

fn open_grid() -> Maze {
    Maze::from_matrix(&vec![vec![0; 5]; 5], (4, 1), (4, 4)).unwrap()
}

#[test]
fn open_grid_takes_the_direct_route() {
    let mut maze = open_grid();
    let mut vi = ValueIteration::new(DpConfig::default()).unwrap();
    let convergence = vi.solve(&maze);

    assert!(convergence.converged);
    assert!(convergence.iterations < 100, "{} sweeps", convergence.iterations);

    let rollout = vi.run_policy(&mut maze, 100);
    assert!(rollout.reached_goal);
    assert_eq!(rollout.steps(), 3, "Manhattan distance from (4,1) to (4,4)");
    assert_eq!(Some(rollout.steps()), shortest_path(&maze));
}

#[test]
fn wall_forces_a_detour() {
    let mut maze: Maze = "
        . . . . .
        . . . . .
        . . # . .
        . . # . .
        . S # . G
    "
    .parse()
    .unwrap();
    let shortest = shortest_path(&maze).unwrap();
    assert_eq!(shortest, 9);

    let mut vi = ValueIteration::new(DpConfig::default()).unwrap();
    assert!(vi.solve(&maze).converged);
    let rollout = vi.run_policy(&mut maze, shortest);
    assert!(rollout.reached_goal, "Goal reached within the shortest path length");
    assert_eq!(rollout.steps(), shortest);
    assert!(rollout.states.iter().all(|&pos| maze.is_open(pos)), "Walked through a wall");

    let mut pi = PolicyIteration::new(DpConfig::default()).unwrap();
    assert!(pi.solve(&maze).stable);
    assert_eq!(pi.policy(), vi.policy());
    assert_eq!(pi.run_policy(&mut maze, shortest).steps(), shortest);
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    sum / f64::from(n)
}

#[test]
fn runner_learner_improves_and_persists() {
    let path = std::env::temp_dir().join(format!("tabrl-scenario-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let config = QLearningAgentConfig {
        alpha: 0.1,
        gamma: 0.9,
        epsilon: 0.1,
        epsilon_min: 0.01,
        epsilon_decay: 0.98,
        max_steps: 2_000,
        seed: 42,
    };
    let runner_config = RunnerConfig {
        seed: 7,
        ..Default::default()
    };

    let mut agent =
        QLearningAgent::<_, RunnerAction>::new(config, RunnerDiscretizer::default()).unwrap();
    let mut env = ObstacleRunner::new(runner_config).unwrap();
    let mut store = JsonFileStore::new(&path);
    let reports = agent.train(&mut env, 200, &mut store);

    assert_eq!(reports.len(), 200);
    let early = mean(reports[..50].iter().map(|r| r.total_reward));
    let late = mean(reports[150..].iter().map(|r| r.total_reward));
    assert!(late >= early, "Mean reward fell from {early} to {late}");

    let loaded = TableStore::<RunnerState>::load(&mut JsonFileStore::new(&path))
        .unwrap()
        .expect("table saved during training");
    assert_eq!(loaded.len(), agent.q_table().len());
    for (state, _) in agent.q_table().iter() {
        let replayed = RunnerAction::ALL[loaded.greedy_readonly(state)];
        assert_eq!(replayed, agent.greedy_action(state), "Action differs at {state:?}");
    }

    let restored =
        QLearningAgent::<_, RunnerAction>::new(config, RunnerDiscretizer::default())
            .unwrap()
            .with_table(loaded)
            .unwrap();
    let mut fresh = ObstacleRunner::new(runner_config).unwrap();
    let original = run_policy(&mut fresh, &agent.greedy_policy(), 500);
    let mut fresh = ObstacleRunner::new(runner_config).unwrap();
    let replay = run_policy(&mut fresh, &restored.greedy_policy(), 500);
    assert_eq!(original, replay);

    std::fs::remove_file(path).unwrap();
}
