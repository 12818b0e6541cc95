use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::VariantArray;

use crate::{
    env::{DiscreteAction, DiscreteStateSpace, Environment, Model},
    rollout::Policy,
    Error, Result,
};

/// Grid coordinates as `(row, col)`
pub type Pos = (usize, usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Open,
    Wall,
}

#[derive(
    VariantArray, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MazeAction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl DiscreteAction for MazeAction {
    const ALL: &'static [Self] = Self::VARIANTS;

    fn index(self) -> usize {
        self as usize
    }
}

impl MazeAction {
    fn arrow(self) -> char {
        match self {
            MazeAction::Up => '^',
            MazeAction::Down => 'v',
            MazeAction::Left => '<',
            MazeAction::Right => '>',
        }
    }
}

/// Reward received on entering each cell
///
/// Rewards depend only on the destination cell, never on the source or the action.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewards {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Rewards {
    /// A fixed step cost everywhere except the goal
    pub fn uniform(rows: usize, cols: usize, step: f64, goal: Pos, goal_reward: f64) -> Self {
        let mut values = vec![step; rows * cols];
        if goal.0 < rows && goal.1 < cols {
            values[goal.0 * cols + goal.1] = goal_reward;
        }
        Self { values, rows, cols }
    }

    /// A per-cell reward table
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let (n_rows, n_cols) = dimensions(&rows)?;
        Ok(Self {
            values: rows.into_iter().flatten().collect(),
            rows: n_rows,
            cols: n_cols,
        })
    }

    pub fn get(&self, pos: Pos) -> f64 {
        self.values[pos.0 * self.cols + pos.1]
    }
}

/// A deterministic grid maze with known transition and reward tables
///
/// Moving off the grid or into a wall leaves the agent where it is. Entering the goal ends the
/// episode.
#[derive(Debug, Clone)]
pub struct Maze {
    cells: Vec<Cell>,
    rows: usize,
    cols: usize,
    rewards: Rewards,
    start: Pos,
    goal: Pos,
    pos: Pos,
}

impl Maze {
    /// Step cost of the default reward table
    pub const STEP_REWARD: f64 = -1.0;
    /// Goal reward of the default reward table
    pub const GOAL_REWARD: f64 = 100.0;

    /// Build a maze from a matrix where `0` is open and `1` is a wall
    ///
    /// Rewards default to [`STEP_REWARD`](Self::STEP_REWARD) per step and
    /// [`GOAL_REWARD`](Self::GOAL_REWARD) for entering the goal.
    pub fn from_matrix(matrix: &[Vec<u8>], start: Pos, goal: Pos) -> Result<Self> {
        let (rows, cols) = dimensions(matrix)?;
        let cells = matrix
            .iter()
            .flatten()
            .map(|&v| match v {
                0 => Ok(Cell::Open),
                1 => Ok(Cell::Wall),
                other => Err(Error::InvalidMaze(format!("unknown cell value {other}"))),
            })
            .collect::<Result<Vec<_>>>()?;

        Self::build(cells, rows, cols, start, goal)
    }

    fn build(cells: Vec<Cell>, rows: usize, cols: usize, start: Pos, goal: Pos) -> Result<Self> {
        let maze = Self {
            cells,
            rows,
            cols,
            rewards: Rewards::uniform(rows, cols, Self::STEP_REWARD, goal, Self::GOAL_REWARD),
            start,
            goal,
            pos: start,
        };

        for (name, pos) in [("start", start), ("goal", goal)] {
            if !maze.is_open(pos) {
                return Err(Error::InvalidMaze(format!(
                    "{name} {pos:?} is not an open cell of the {rows}x{cols} grid"
                )));
            }
        }

        Ok(maze)
    }

    /// Replace the reward table
    pub fn with_rewards(mut self, rewards: Rewards) -> Result<Self> {
        if (rewards.rows, rewards.cols) != (self.rows, self.cols) {
            return Err(Error::InvalidMaze(format!(
                "reward table is {}x{}, maze is {}x{}",
                rewards.rows, rewards.cols, self.rows, self.cols
            )));
        }
        self.rewards = rewards;
        Ok(self)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goal(&self) -> Pos {
        self.goal
    }

    /// The agent's current position
    pub fn position(&self) -> Pos {
        self.pos
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    /// Whether `pos` is inside the grid and not a wall
    pub fn is_open(&self, pos: Pos) -> bool {
        pos.0 < self.rows && pos.1 < self.cols && self.cells[pos.0 * self.cols + pos.1] == Cell::Open
    }

    /// The deterministic transition function
    pub fn transition(&self, pos: Pos, action: MazeAction) -> Pos {
        let (row, col) = pos;
        let next = match action {
            MazeAction::Up if row > 0 => (row - 1, col),
            MazeAction::Down => (row + 1, col),
            MazeAction::Left if col > 0 => (row, col - 1),
            MazeAction::Right => (row, col + 1),
            _ => return pos,
        };

        if self.is_open(next) {
            next
        } else {
            pos
        }
    }

    /// Draw one arrow per open cell showing the action `policy` takes there
    pub fn render_policy<P: Policy<Pos, MazeAction>>(&self, policy: &P) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols * 2 + 1));
        for row in 0..self.rows {
            let line = (0..self.cols)
                .map(|col| {
                    let pos = (row, col);
                    if !self.is_open(pos) {
                        '#'
                    } else if pos == self.goal {
                        'G'
                    } else {
                        policy.act(&pos).arrow()
                    }
                })
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

impl Environment for Maze {
    type State = Pos;
    type Action = MazeAction;

    fn step(&mut self, action: Self::Action) -> (Self::State, f64, bool) {
        let (next, reward) = self.peek(&self.pos, action);
        self.pos = next;
        (next, reward, next == self.goal)
    }

    fn reset(&mut self) -> Self::State {
        self.pos = self.start;
        self.pos
    }
}

impl DiscreteStateSpace for Maze {
    fn states(&self) -> Vec<Self::State> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (row, col)))
            .filter(|&pos| self.is_open(pos))
            .collect()
    }
}

impl Model for Maze {
    fn peek(&self, state: &Self::State, action: Self::Action) -> (Self::State, f64) {
        let next = self.transition(*state, action);
        (next, self.rewards.get(next))
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        *state == self.goal
    }
}

/// Parses an ASCII layout: `#` wall, `.` open, `S` start, `G` goal
///
/// Whitespace between cells is ignored; blank lines are skipped.
impl FromStr for Maze {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut grid = Vec::new();
        let (mut start, mut goal) = (None, None);

        for line in s.lines().filter(|l| !l.trim().is_empty()) {
            let row = grid.len();
            let mut cells = Vec::new();
            for ch in line.chars().filter(|c| !c.is_whitespace()) {
                let col = cells.len();
                let cell = match ch {
                    '#' => Cell::Wall,
                    '.' => Cell::Open,
                    'S' => {
                        start = Some((row, col));
                        Cell::Open
                    }
                    'G' => {
                        goal = Some((row, col));
                        Cell::Open
                    }
                    other => {
                        return Err(Error::InvalidMaze(format!(
                            "unknown cell '{other}' at {:?}",
                            (row, col)
                        )))
                    }
                };
                cells.push(cell);
            }
            grid.push(cells);
        }

        let (rows, cols) = dimensions(&grid)?;
        let start = start.ok_or_else(|| Error::InvalidMaze("missing start 'S'".into()))?;
        let goal = goal.ok_or_else(|| Error::InvalidMaze("missing goal 'G'".into()))?;

        Self::build(grid.into_iter().flatten().collect(), rows, cols, start, goal)
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let pos = (row, col);
                let ch = if pos == self.start {
                    'S'
                } else if pos == self.goal {
                    'G'
                } else if self.is_open(pos) {
                    '.'
                } else {
                    '#'
                };
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn dimensions<T>(rows: &[Vec<T>]) -> Result<(usize, usize)> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    if cols == 0 {
        return Err(Error::InvalidMaze("grid is empty".into()));
    }
    if rows.iter().any(|r| r.len() != cols) {
        return Err(Error::InvalidMaze("grid rows differ in length".into()));
    }
    Ok((rows.len(), cols))
}
