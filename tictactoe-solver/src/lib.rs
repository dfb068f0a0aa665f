//! Precomputed tables and lookup engines for tic-tac-toe.
//!
//! - [`symtable`]: canonical form of every pattern in the 3^9 keyspace.
//! - [`tablebase`]: best moves for every canonical unfinished position.
//! - [`engine`]: move selection from search or from the tablebase.
//! - [`context`]: the loaded tables and search backend, shared by the binaries.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
mod error;
pub mod sqlite;
pub mod stats;
pub mod symtable;
pub mod tablebase;
pub mod verify;

pub use config::{Config, DEFAULT_TABLEBASE};
pub use context::Context;
pub use engine::{random_move, Engine, MinimaxEngine, TablebaseEngine, TieBreak};
pub use error::{Result, SolverError};
pub use stats::{count_tree, BuildStats, TreeCount};
pub use symtable::{SymEntry, SymmetryTable};
pub use tablebase::{Entry, Tablebase};
