use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::VariantArray;

use crate::{
    ensure_positive,
    env::{DiscreteAction, Environment},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Sits on the ground; must be jumped over
    Low,
    /// Hangs above a standing agent; hits only an agent in the air
    High,
}

#[derive(
    VariantArray, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RunnerAction {
    None = 0,
    Jump = 1,
    Duck = 2,
}

impl DiscreteAction for RunnerAction {
    const ALL: &'static [Self] = Self::VARIANTS;

    fn index(self) -> usize {
        self as usize
    }
}

/// Game constants for the [`ObstacleRunner`], in pixels and frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub screen_width: i32,
    pub ground_y: i32,
    pub gravity: i32,
    pub jump_velocity: i32,
    pub duck_frames: u32,
    pub obstacle_speed: i32,
    /// Frames between obstacle spawns
    pub obstacle_interval: u32,
    pub survive_reward: f64,
    pub collision_reward: f64,
    /// Seed of the obstacle kind stream
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            screen_width: 800,
            ground_y: 330,
            gravity: 1,
            jump_velocity: -15,
            duck_frames: 15,
            obstacle_speed: 7,
            obstacle_interval: 90,
            survive_reward: 1.0,
            collision_reward: -10.0,
            seed: 0,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive!(self.screen_width);
        ensure_positive!(self.ground_y);
        ensure_positive!(self.gravity);
        ensure_positive!(self.obstacle_speed);
        ensure_positive!(self.obstacle_interval);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Rect {
    fn right(&self) -> i32 {
        self.x + self.w
    }

    fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

#[derive(Debug, Clone)]
struct Agent {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    vel_y: i32,
    duck_timer: u32,
}

impl Agent {
    fn new(ground_y: i32) -> Self {
        let height = 60;
        Self {
            x: 50,
            y: ground_y - height,
            width: 40,
            height,
            vel_y: 0,
            duck_timer: 0,
        }
    }

    fn on_ground(&self, ground_y: i32) -> bool {
        self.y >= ground_y - self.height && self.vel_y == 0
    }

    fn update(&mut self, config: &RunnerConfig) {
        let floor = config.ground_y - self.height;
        if !self.on_ground(config.ground_y) {
            self.vel_y += config.gravity;
            self.y += self.vel_y;
            if self.y >= floor {
                self.y = floor;
                self.vel_y = 0;
            }
        }

        self.duck_timer = self.duck_timer.saturating_sub(1);
    }

    /// Ducking halves the hit box, keeping its bottom edge on the ground
    fn hitbox(&self) -> Rect {
        if self.duck_timer > 0 {
            let h = self.height / 2;
            Rect {
                x: self.x,
                y: self.y + self.height - h,
                w: self.width,
                h,
            }
        } else {
            Rect {
                x: self.x,
                y: self.y,
                w: self.width,
                h: self.height,
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Obstacle {
    rect: Rect,
    kind: ObstacleKind,
}

impl Obstacle {
    fn new(kind: ObstacleKind, config: &RunnerConfig) -> Self {
        let (h, y) = match kind {
            ObstacleKind::Low => (40, config.ground_y - 40),
            ObstacleKind::High => (30, config.ground_y - 150),
        };
        Self {
            rect: Rect {
                x: config.screen_width,
                y,
                w: 30,
                h,
            },
            kind,
        }
    }
}

/// The nearest obstacle ahead of the agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    /// Horizontal distance from the agent's right edge to the obstacle's left edge
    ///
    /// Negative while the obstacle overlaps the agent.
    pub gap: f64,
    pub kind: ObstacleKind,
}

/// What the agent sees after each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub obstacle: Option<ObstacleView>,
    /// Frames of ducking left
    pub duck_timer: u32,
    pub on_ground: bool,
    /// Frames survived this episode
    pub score: u64,
}

/// A side-scrolling obstacle avoidance game, simulated without rendering
///
/// Obstacles of a random kind enter from the right at a fixed interval. The agent earns a reward
/// for every frame survived and a penalty on collision, which ends the episode. The dynamics are
/// only observable by stepping the game.
#[derive(Debug, Clone)]
pub struct ObstacleRunner {
    config: RunnerConfig,
    agent: Agent,
    obstacles: Vec<Obstacle>,
    frames_since_obstacle: u32,
    score: u64,
    game_over: bool,
    rng: StdRng,
}

impl ObstacleRunner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            agent: Agent::new(config.ground_y),
            obstacles: Vec::new(),
            frames_since_obstacle: 0,
            score: 0,
            game_over: false,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn observe(&self) -> Observation {
        let agent = self.agent.hitbox();
        let obstacle = self
            .obstacles
            .iter()
            .find(|o| o.rect.right() >= agent.right())
            .map(|o| ObstacleView {
                gap: f64::from(o.rect.x - agent.right()),
                kind: o.kind,
            });

        Observation {
            obstacle,
            duck_timer: self.agent.duck_timer,
            on_ground: self.agent.on_ground(self.config.ground_y),
            score: self.score,
        }
    }

    fn spawn_obstacle(&mut self) {
        let kind = if self.rng.gen_bool(0.5) {
            ObstacleKind::Low
        } else {
            ObstacleKind::High
        };
        self.obstacles.push(Obstacle::new(kind, &self.config));
    }
}

impl Environment for ObstacleRunner {
    type State = Observation;
    type Action = RunnerAction;

    fn step(&mut self, action: Self::Action) -> (Self::State, f64, bool) {
        if self.game_over {
            return (self.observe(), 0.0, true);
        }

        let ground_y = self.config.ground_y;
        match action {
            RunnerAction::Jump if self.agent.on_ground(ground_y) && self.agent.duck_timer == 0 => {
                self.agent.vel_y = self.config.jump_velocity;
            }
            RunnerAction::Duck if self.agent.on_ground(ground_y) => {
                self.agent.duck_timer = self.config.duck_frames;
            }
            _ => {}
        }

        self.agent.update(&self.config);
        for o in &mut self.obstacles {
            o.rect.x -= self.config.obstacle_speed;
        }
        self.obstacles.retain(|o| o.rect.right() > 0);

        self.frames_since_obstacle += 1;
        if self.frames_since_obstacle >= self.config.obstacle_interval {
            self.spawn_obstacle();
            self.frames_since_obstacle = 0;
        }

        let hitbox = self.agent.hitbox();
        self.game_over = self.obstacles.iter().any(|o| hitbox.intersects(&o.rect));
        self.score += 1;

        let reward = if self.game_over {
            self.config.collision_reward
        } else {
            self.config.survive_reward
        };

        (self.observe(), reward, self.game_over)
    }

    fn reset(&mut self) -> Self::State {
        self.agent = Agent::new(self.config.ground_y);
        self.obstacles.clear();
        self.frames_since_obstacle = 0;
        self.score = 0;
        self.game_over = false;
        self.observe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ObstacleRunner {
        ObstacleRunner::new(RunnerConfig::default()).unwrap()
    }

    #[test]
    fn config_validation() {
        let config = RunnerConfig {
            obstacle_interval: 0,
            ..Default::default()
        };
        assert!(ObstacleRunner::new(config).is_err());
    }

    #[test]
    fn jump_arc() {
        let mut env = runner();
        let obs = env.reset();
        assert!(obs.on_ground);

        let (obs, reward, done) = env.step(RunnerAction::Jump);
        assert!(!obs.on_ground, "Agent left the ground");
        assert_eq!((reward, done), (1.0, false));

        let (obs, _, _) = env.step(RunnerAction::Jump);
        assert!(!obs.on_ground, "Cannot jump again mid-air");

        for _ in 0..26 {
            assert!(!env.step(RunnerAction::None).0.on_ground);
        }
        assert!(env.step(RunnerAction::None).0.on_ground, "Agent landed after 29 frames");
    }

    #[test]
    fn duck_blocks_jump() {
        let mut env = runner();
        env.reset();
        let (obs, _, _) = env.step(RunnerAction::Duck);
        assert_eq!(obs.duck_timer, 14);
        let (obs, _, _) = env.step(RunnerAction::Jump);
        assert!(obs.on_ground, "Jump ignored while ducking");
        assert_eq!(env.agent.hitbox().h, 30, "Ducking halves the hit box");
    }

    #[test]
    fn obstacles_spawn_on_interval() {
        let mut env = runner();
        env.reset();
        for _ in 0..89 {
            assert_eq!(env.step(RunnerAction::None).0.obstacle, None);
        }
        let (obs, _, _) = env.step(RunnerAction::None);
        let view = obs.obstacle.expect("obstacle spawned on frame 90");
        assert_eq!(view.gap, 710.0);

        let (obs, _, _) = env.step(RunnerAction::None);
        assert_eq!(obs.obstacle.unwrap().gap, 703.0, "Obstacle moves 7px per frame");
        assert_eq!(obs.score, 91);
    }

    #[test]
    fn low_obstacle_collision_ends_episode() {
        let mut env = runner();
        env.reset();
        let mut low = Obstacle::new(ObstacleKind::Low, &env.config);
        low.rect.x = 80;
        env.obstacles.push(low);

        let (_, reward, done) = env.step(RunnerAction::None);
        assert_eq!((reward, done), (-10.0, true), "Standing agent hits a low obstacle");
        assert!(env.is_over());

        let (_, reward, done) = env.step(RunnerAction::None);
        assert_eq!((reward, done), (0.0, true), "Stepping a finished game is inert");
    }

    #[test]
    fn high_obstacle_only_hits_airborne_agent() {
        let mut env = runner();
        env.reset();
        let mut high = Obstacle::new(ObstacleKind::High, &env.config);
        high.rect.x = 60;
        env.obstacles.push(high.clone());
        let (_, reward, done) = env.step(RunnerAction::None);
        assert_eq!((reward, done), (1.0, false), "Standing agent passes under");

        env.reset();
        env.obstacles.push(high);
        env.agent.y = 140;
        let (_, reward, done) = env.step(RunnerAction::None);
        assert_eq!((reward, done), (-10.0, true), "Airborne agent hits a high obstacle");
    }

    #[test]
    fn same_seed_same_obstacles() {
        let kinds = |seed| {
            let mut env = ObstacleRunner::new(RunnerConfig {
                seed,
                obstacle_interval: 1,
                ..Default::default()
            })
            .unwrap();
            env.reset();
            (0..20)
                .map(|_| {
                    env.step(RunnerAction::None);
                    env.obstacles.last().map(|o| o.kind)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(kinds(42), kinds(42));
    }
}
