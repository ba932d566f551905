//! Per-search-worker state: the history tables, SEE cache, and root
//! position bookkeeping a single search thread owns exclusively.
//!
//! A [`WorkUnit`] is created once per worker and lives for as long as
//! the worker pool is configured at that size; it is never shared
//! across threads, so nothing in here needs synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

use chesscore::movegen::moves::Move;

use crate::history_tables::History;
use crate::position::Position;
use crate::see_cache::SeeCache;

/// Extra work units kept beyond the configured thread count, mirroring
/// the "+1 overload" convention engines use to keep a spare unit warm
/// for auxiliary tasks (pondering, analysis) without resizing the pool.
const POOL_OVERLOAD: usize = 1;

#[derive(Debug)]
pub struct WorkUnit {
    /// The position this worker's search is rooted at.
    pub root_position: Position,

    /// Legal moves available at the root, searched in order.
    pub root_moves: Vec<Move>,

    /// Depth of the currently ongoing root search, in plies.
    pub root_depth: usize,

    /// Deepest depth this worker has *completed* a full search of.
    pub completed_depth: usize,

    pub history: History,
    pub see_cache: SeeCache,

    nodes: AtomicU64,
}

impl WorkUnit {
    pub fn new(root_position: Position) -> Self {
        let root_moves = root_position.board.legal_moves::<true>();

        Self {
            root_position,
            root_moves,
            root_depth: 0,
            completed_depth: 0,
            history: History::new(),
            see_cache: SeeCache::new(),
            nodes: AtomicU64::new(0),
        }
    }

    /// Reset this unit to search a fresh root position, keeping the
    /// history tables (aged, not wiped) since cross-search history is
    /// still a useful prior.
    pub fn set_root_position(&mut self, root_position: Position) {
        self.root_moves = root_position.board.legal_moves::<true>();
        self.root_position = root_position;
        self.root_depth = 0;
        self.completed_depth = 0;
        self.history.age_entries();
        self.history.clear_all_killers();
        self.see_cache.clear();
        self.nodes.store(0, Ordering::Relaxed);
    }

    pub fn add_nodes(&self, n: u64) {
        self.nodes.fetch_add(n, Ordering::Relaxed);
    }

    /// Nodes searched by this unit so far. Safe to read concurrently
    /// with `add_nodes` from the owning worker; the count only ever
    /// increases.
    pub fn nodes_searched(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }
}

/// A resizable collection of [`WorkUnit`]s, one per search worker plus a
/// small overload.
#[derive(Debug, Default)]
pub struct WorkUnitPool {
    units: Vec<WorkUnit>,
}

impl WorkUnitPool {
    /// Create a pool with a single work unit, as happens on engine
    /// startup before the thread count is known.
    pub fn init(root_position: Position) -> Self {
        Self {
            units: vec![WorkUnit::new(root_position)],
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&WorkUnit> {
        self.units.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut WorkUnit> {
        self.units.get_mut(idx)
    }

    /// Adjust the pool to hold `threads + overload` units, creating or
    /// destroying units at the tail. Cloning the most recent root
    /// position into any newly created unit so it starts in a sane
    /// state; the caller is expected to re-set it before searching.
    pub fn resize(&mut self, threads: usize, root_position: &Position) {
        let target = threads + POOL_OVERLOAD;

        while self.units.len() < target {
            self.units.push(WorkUnit::new(root_position.clone()));
        }

        self.units.truncate(target);
    }

    pub fn exit(&mut self) {
        self.units.clear();
    }

    /// Sum of nodes searched across every unit in the pool.
    pub fn nodes_searched(&self) -> u64 {
        self.units.iter().map(WorkUnit::nodes_searched).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkUnit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, WorkUnit> {
        self.units.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chesscore::board::Board;
    use std::str::FromStr;

    fn starting_position() -> Position {
        Position::new(Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap())
    }

    #[test]
    fn resize_grows_and_shrinks_with_overload() {
        let mut pool = WorkUnitPool::init(starting_position());
        assert_eq!(pool.len(), 1);

        pool.resize(4, &starting_position());
        assert_eq!(pool.len(), 5);

        pool.resize(1, &starting_position());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn nodes_searched_sums_all_units() {
        let mut pool = WorkUnitPool::init(starting_position());
        pool.resize(2, &starting_position());

        for unit in pool.iter() {
            unit.add_nodes(10);
        }

        assert_eq!(pool.nodes_searched(), 30);
    }

    #[test]
    fn exit_empties_the_pool() {
        let mut pool = WorkUnitPool::init(starting_position());
        pool.exit();
        assert!(pool.is_empty());
    }
}
