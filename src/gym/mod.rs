pub mod maze;
pub mod obstacle_runner;

pub use maze::{Maze, MazeAction, Pos, Rewards};
pub use obstacle_runner::{ObstacleRunner, Observation, RunnerAction, RunnerConfig};
