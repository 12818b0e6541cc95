use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{algo::Hashable, util::argmax, Error, Result};

/// Action-value estimates, one fixed-length row per visited state
///
/// Rows are created lazily: [`get_or_insert_default`](QTable::get_or_insert_default) inserts an
/// all-zero row for a state it has not seen. Read-only accessors never insert.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable<S: Hashable> {
    rows: HashMap<S, Vec<f64>>,
    actions: usize,
}

/// Serialized form of a [`QTable`]
///
/// Entries are a list rather than a map so that structured state keys survive formats whose
/// maps only take string keys. Entry order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTableSnapshot<S> {
    pub actions: usize,
    pub entries: Vec<(S, Vec<f64>)>,
}

impl<S: Hashable> QTable<S> {
    /// An empty table with `actions` values per row
    pub fn new(actions: usize) -> Self {
        Self {
            rows: HashMap::new(),
            actions,
        }
    }

    /// Number of actions per row
    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Number of states with a row
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.rows.contains_key(state)
    }

    /// The row for `state`, if it has been visited
    pub fn get(&self, state: &S) -> Option<&[f64]> {
        self.rows.get(state).map(Vec::as_slice)
    }

    /// The row for `state`, inserting an all-zero row first if the state is new
    pub fn get_or_insert_default(&mut self, state: S) -> &mut [f64] {
        let actions = self.actions;
        self.rows.entry(state).or_insert_with(|| vec![0.0; actions])
    }

    /// Largest action value in `state`, inserting a zero row for a new state
    pub fn max(&mut self, state: S) -> f64 {
        self.get_or_insert_default(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Index of the best action in `state`, ties broken by the lowest index
    ///
    /// Inserts a zero row for a new state.
    pub fn greedy(&mut self, state: S) -> usize {
        argmax(self.get_or_insert_default(state)).unwrap_or(0)
    }

    /// Index of the best action in `state` without inserting; unseen states pick action `0`
    pub fn greedy_readonly(&self, state: &S) -> usize {
        self.get(state).and_then(argmax).unwrap_or(0)
    }

    /// Q-learning update `Q[s][a] ← (1-α)·Q[s][a] + α·(r + γ·max(Q[s']))`
    ///
    /// **Returns** the new value of `Q[s][a]`
    pub fn update(
        &mut self,
        state: S,
        action: usize,
        reward: f64,
        next_state: S,
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        let target = reward + gamma * self.max(next_state);
        let q = &mut self.get_or_insert_default(state)[action];
        *q = (1.0 - alpha) * *q + alpha * target;
        *q
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &[f64])> {
        self.rows.iter().map(|(s, row)| (s, row.as_slice()))
    }

    pub fn to_snapshot(&self) -> QTableSnapshot<S> {
        QTableSnapshot {
            actions: self.actions,
            entries: self.rows.iter().map(|(s, row)| (*s, row.clone())).collect(),
        }
    }

    /// Rebuild a table, rejecting rows of the wrong length and non-finite values
    pub fn from_snapshot(snapshot: QTableSnapshot<S>) -> Result<Self> {
        let QTableSnapshot { actions, entries } = snapshot;
        let mut rows = HashMap::with_capacity(entries.len());
        for (state, row) in entries {
            if row.len() != actions {
                return Err(Error::CorruptTable(format!(
                    "row has {} values, expected {actions}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(Error::CorruptTable("row holds a non-finite value".into()));
            }
            if rows.insert(state, row).is_some() {
                return Err(Error::CorruptTable("duplicate state".into()));
            }
        }
        Ok(Self { rows, actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_state_is_inserted_as_zero_row() {
        let mut table = QTable::new(3);
        assert_eq!(table.get(&7), None, "Reads do not insert");
        assert_eq!(table.greedy_readonly(&7), 0);
        assert!(table.is_empty());

        assert_eq!(table.get_or_insert_default(7), &[0.0, 0.0, 0.0]);
        assert!(table.contains(&7), "Zero row stays in the table");
        assert_eq!(table.max(8), 0.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn greedy_prefers_lowest_index_on_ties() {
        let mut table = QTable::new(3);
        table.get_or_insert_default(0).copy_from_slice(&[1.0, 2.0, 2.0]);
        assert_eq!(table.greedy(0), 1);
        assert_eq!(table.greedy(1), 0, "All-zero row picks the first action");
    }

    #[test]
    fn update_moves_toward_target() {
        let mut table = QTable::new(2);
        table.get_or_insert_default(1).copy_from_slice(&[4.0, 10.0]);
        table.get_or_insert_default(0).copy_from_slice(&[2.0, 0.0]);

        let target = 1.0 + 0.9 * 10.0;
        let q = table.update(0, 0, 1.0, 1, 0.1, 0.9);
        assert!((q - (0.9 * 2.0 + 0.1 * target)).abs() < 1e-12);
        assert!(2.0 < q && q < target, "Strictly between old value and target");

        let q = table.update(0, 1, 1.0, 1, 1.0, 0.9);
        assert!((q - target).abs() < 1e-12, "alpha = 1 jumps to the target");
    }

    #[test]
    fn update_inserts_unseen_states() {
        let mut table = QTable::new(2);
        let q = table.update(0, 1, -10.0, 1, 0.5, 0.9);
        assert_eq!(q, -5.0);
        assert_eq!(table.get(&0), Some(&[0.0, -5.0][..]));
        assert_eq!(table.get(&1), Some(&[0.0, 0.0][..]), "Next state got a zero row");
    }

    #[test]
    fn snapshot_round_trip() {
        let mut table = QTable::new(2);
        table.update((0, 1), 1, 3.0, (0, 2), 0.5, 0.9);
        table.update((0, 2), 0, -1.0, (0, 1), 0.5, 0.9);

        let json = serde_json::to_string(&table.to_snapshot()).unwrap();
        let restored = QTable::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn snapshot_rejects_bad_rows() {
        let short = QTableSnapshot {
            actions: 3,
            entries: vec![(0, vec![0.0, 1.0])],
        };
        assert!(QTable::from_snapshot(short).is_err());

        let duplicate = QTableSnapshot {
            actions: 1,
            entries: vec![(0, vec![0.0]), (0, vec![1.0])],
        };
        assert!(QTable::from_snapshot(duplicate).is_err());
    }
}
