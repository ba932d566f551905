//! Plain constants standing in for the tunable search parameters the
//! move picker depends on. A full search would expose these as SPSA
//! tunables; this crate only needs fixed values.

pub const MAX_DEPTH: usize = 128;
pub const MAX_KILLERS: usize = 2;

/// Divisor used when aging history tables between searches.
pub const HIST_AGE_DIVISOR: i16 = 2;

/// Number of leading plies tracked by the low-ply history table.
pub const LOW_PLY_HISTORY_SIZE: usize = 4;

/// Number of buckets in the pawn-structure-indexed history table.
pub const PAWN_HISTORY_SIZE: usize = 4096;

/// Decay constant for plain history tables (main, capture, pawn, low-ply).
pub const HISTORY_DECAY: i32 = 324;

/// Decay constant for the continuation history, which ages slower since
/// its entries are conditioned on much rarer (piece, destination, parent
/// move) triples.
pub const CONT_HISTORY_DECAY: i32 = 936;

/// Magnitude clip applied to every raw update before scaling.
pub const MAX_UPDATE: i32 = 324;
