/// Model-based solvers: value iteration and policy iteration
pub mod dp;

/// Model-free tabular learners
pub mod tabular;

/// A trait for state and action types that can be used as keys in a [`HashMap`](std::collections::HashMap)
pub trait Hashable: Copy + Eq + std::hash::Hash {}

impl<T> Hashable for T where T: Copy + Eq + std::hash::Hash {}
