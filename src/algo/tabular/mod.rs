mod q_learning;
mod q_table;

pub use q_learning::{Exp, QLearningAgent, QLearningAgentConfig};
pub use q_table::{QTable, QTableSnapshot};
