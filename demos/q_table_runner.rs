use std::path::PathBuf;

use tabrl::{
    algo::tabular::{QLearningAgent, QLearningAgentConfig},
    discretize::RunnerDiscretizer,
    gym::{ObstacleRunner, RunnerAction, RunnerConfig},
    persist::JsonFileStore,
    report::MovingAverage,
};

const NUM_EPISODES: u32 = 500;
const EPISODE_OFFSET: u32 = 0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let out_dir = PathBuf::from("target/q_table_runner");
    std::fs::create_dir_all(&out_dir)?;

    let config = QLearningAgentConfig {
        max_steps: 5_000,
        ..Default::default()
    };
    let mut agent =
        QLearningAgent::<_, RunnerAction>::new(config, RunnerDiscretizer::default())?
            .with_episode(EPISODE_OFFSET);
    let mut env = ObstacleRunner::new(RunnerConfig::default())?;
    let mut store = JsonFileStore::new(out_dir.join("q_table.json"));

    let reports = agent.train(&mut env, NUM_EPISODES, &mut store);

    let mut writer = csv::Writer::from_path(out_dir.join("episodes.csv"))?;
    let mut average = MovingAverage::new(50);
    for report in &reports {
        writer.serialize(report)?;
        average.push(report.total_reward);
    }
    writer.flush()?;

    println!(
        "Trained {} episodes, {} states, trailing mean reward {:.1}",
        reports.len(),
        agent.q_table().len(),
        average.mean().unwrap_or_default()
    );

    Ok(())
}
