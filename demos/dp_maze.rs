use tabrl::{
    algo::dp::{DpConfig, PolicyIteration, ValueIteration},
    env::DiscreteStateSpace,
    gym::Maze,
};

const MAX_STEPS: usize = 1_000;

fn main() -> tabrl::Result<()> {
    tracing_subscriber::fmt::init();

    let matrix = vec![
        vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
        vec![1, 0, 0, 0, 1, 0, 1, 0, 0],
        vec![1, 0, 1, 0, 0, 0, 1, 1, 0],
        vec![1, 0, 1, 0, 1, 0, 0, 0, 0],
        vec![1, 1, 1, 1, 1, 1, 1, 1, 0],
    ];
    let mut maze = Maze::from_matrix(&matrix, (3, 1), (4, 8))?;
    println!("{maze}");

    let config = DpConfig::default();
    let mut vi = ValueIteration::new(config)?;
    let convergence = vi.solve(&maze);
    println!(
        "Value iteration: {} sweeps, converged: {}",
        convergence.iterations, convergence.converged
    );
    for state in maze.states() {
        println!("V{state:?} = {:.3}", vi.state_value().get(&state));
    }
    println!("\n{}", maze.render_policy(vi.policy()));

    let rollout = vi.run_policy(&mut maze, MAX_STEPS);
    println!(
        "Path ({} steps, return {}): {:?}\n",
        rollout.steps(),
        rollout.total_reward,
        rollout.states
    );

    let mut pi = PolicyIteration::new(config)?;
    let report = pi.solve(&maze);
    println!(
        "Policy iteration: {} rounds, {} sweeps, stable: {}",
        report.rounds, report.sweeps, report.stable
    );
    println!("\n{}", maze.render_policy(pi.policy()));

    Ok(())
}
