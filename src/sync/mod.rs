//! The state synchronizer: owner of the single published topology snapshot.
//!
//! The synchronizer is the only writer of the in-memory snapshot; every
//! other component reads through it. Writers serialize on one update lock,
//! readers load an atomically swapped reference and never block.

mod state_synchronizer;
mod watch;
pub use state_synchronizer::*;
pub use watch::WatchState;

#[cfg(test)]
mod state_synchronizer_test;
